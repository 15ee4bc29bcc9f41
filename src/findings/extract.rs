//! Reviewer output extraction
//!
//! Parses raw completion text into structured findings. Expects JSONL (one
//! JSON object per line), possibly wrapped in markdown code fences. Only
//! `type == "finding"` records are kept; malformed lines are skipped.

use serde_json::Value;

use super::record::{Finding, Severity};

/// Extract findings from raw reviewer completion text
///
/// Fence-delimiter lines (lines whose trimmed content starts with ```) are
/// dropped whether or not the fence is balanced - an unclosed opening fence
/// must not swallow the remaining records. Each surviving line is parsed
/// independently; lines that are not valid finding records are skipped.
///
/// The returned iterator borrows the input and is restartable.
pub fn extract_findings(
    completion: &str,
    severity_filter: Option<Severity>,
) -> impl Iterator<Item = Finding> + '_ {
    completion
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("```"))
        .filter_map(parse_finding_line)
        .filter(move |f| severity_filter.map_or(true, |s| f.severity == s))
}

/// Parse one line as a finding record, or None if it isn't one
fn parse_finding_line(line: &str) -> Option<Finding> {
    let value: Value = serde_json::from_str(line).ok()?;
    if value.get("type")?.as_str()? != "finding" {
        return None;
    }
    serde_json::from_value(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FINDING_A: &str = r#"{"type": "finding", "id": "v1-001", "title": "A", "issue": "ia", "severity": "Critical"}"#;
    const FINDING_B: &str = r#"{"type": "finding", "id": "v1-002", "title": "B", "issue": "ib", "severity": "Important"}"#;

    #[test]
    fn test_single_finding() {
        let findings: Vec<_> = extract_findings(FINDING_A, None).collect();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].id.as_deref(), Some("v1-001"));
    }

    #[test]
    fn test_non_finding_records_skipped() {
        let completion = format!(
            "{}\n{}\n{}",
            FINDING_A,
            r#"{"type": "blind_spot_check", "content": "checked assumptions"}"#,
            FINDING_B
        );
        let findings: Vec<_> = extract_findings(&completion, None).collect();
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn test_malformed_lines_skipped() {
        let completion = format!("not json at all\n{}\nalso not json", FINDING_A);
        let findings: Vec<_> = extract_findings(&completion, None).collect();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_empty_completion() {
        assert_eq!(extract_findings("", None).count(), 0);
    }

    #[test]
    fn test_severity_filter() {
        let completion = format!("{}\n{}", FINDING_A, FINDING_B);
        let findings: Vec<_> =
            extract_findings(&completion, Some(Severity::Critical)).collect();
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].severity, Severity::Critical);
    }

    #[test]
    fn test_balanced_fence_stripped() {
        let completion = format!("```json\n{}\n```", FINDING_A);
        let findings: Vec<_> = extract_findings(&completion, None).collect();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_unclosed_fence_does_not_drop_records() {
        // Opening fence with no closing fence - all records still parse
        let completion = format!("```\n{}\n{}", FINDING_A, FINDING_B);
        let findings: Vec<_> = extract_findings(&completion, None).collect();
        assert_eq!(findings.len(), 2);
    }

    #[test]
    fn test_indented_fence_stripped() {
        let completion = format!("  ```json\n{}\n  ```", FINDING_A);
        let findings: Vec<_> = extract_findings(&completion, None).collect();
        assert_eq!(findings.len(), 1);
    }

    #[test]
    fn test_iterator_is_restartable() {
        let completion = format!("{}\n{}", FINDING_A, FINDING_B);
        assert_eq!(extract_findings(&completion, None).count(), 2);
        assert_eq!(extract_findings(&completion, None).count(), 2);
    }

    #[test]
    fn test_finding_missing_required_field_skipped() {
        // No title - not a usable finding record
        let completion = r#"{"type": "finding", "id": "x", "issue": "i", "severity": "Critical"}"#;
        assert_eq!(extract_findings(completion, None).count(), 0);
    }
}
