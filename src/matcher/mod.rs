//! Deterministic finding matcher
//!
//! Matches produced findings against expected ground truth without a judge:
//! exact ID equality first, then fuzzy title matching at equal severity.
//! Each produced finding can satisfy at most one expected finding - one
//! true positive must not inflate recall against near-duplicate expected
//! entries.
//!
//! Consumption is tracked by the *produced* finding's own identity, never
//! the expected finding's id: produced IDs are session-local sequence
//! numbers with no cross-run stability, so expected and actual ids cannot
//! be assumed to coincide.

use std::collections::HashSet;

use crate::findings::Finding;

/// Minimum title similarity for a fuzzy match
pub const TITLE_SIMILARITY_THRESHOLD: f64 = 0.80;

/// Identity of a produced finding for consumption tracking
///
/// Uses the finding's own id when present, otherwise its position in the
/// produced sequence. Findings without ids degrade to title/severity
/// matching; they never error.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FindingKey {
    Id(String),
    Ordinal(usize),
}

impl FindingKey {
    fn of(finding: &Finding, index: usize) -> Self {
        match &finding.id {
            Some(id) => Self::Id(id.clone()),
            None => Self::Ordinal(index),
        }
    }
}

/// Result of matching produced findings against expected findings
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// Expected findings that were matched, in expected order
    pub matched: Vec<Finding>,
    /// Keys of the produced findings consumed by a match
    pub consumed: HashSet<FindingKey>,
}

/// Title similarity ratio in [0, 1]
///
/// Case-insensitive character-sequence similarity:
/// `2 * LCS(a, b) / (|a| + |b|)`. Two empty strings are identical (1.0).
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let lcs = lcs_length(&a, &b);
    (2.0 * lcs as f64) / (a.len() + b.len()) as f64
}

/// Longest common subsequence length
fn lcs_length(a: &[char], b: &[char]) -> usize {
    let (m, n) = (a.len(), b.len());
    let mut dp = vec![vec![0usize; n + 1]; m + 1];
    for i in 1..=m {
        for j in 1..=n {
            dp[i][j] = if a[i - 1] == b[j - 1] {
                dp[i - 1][j - 1] + 1
            } else {
                dp[i - 1][j].max(dp[i][j - 1])
            };
        }
    }
    dp[m][n]
}

/// Match produced findings to expected ground truth findings
///
/// Strategy per expected finding, in given order:
/// 1. If any produced finding carries the expected id, the expected
///    resolves on the id path only: matched iff that id is unconsumed.
/// 2. Otherwise, fuzzy fallback: the first unconsumed produced finding
///    with equal severity and title similarity >= 0.80 is consumed.
///
/// Ties among equally similar candidates break by first-encountered order,
/// keeping the result deterministic.
pub fn match_findings(actual: &[Finding], expected: &[Finding]) -> MatchResult {
    let mut matched = Vec::new();
    let mut consumed: HashSet<FindingKey> = HashSet::new();

    for exp in expected {
        // Exact ID match - consume that produced finding
        if let Some(exp_id) = exp.id.as_deref() {
            if actual.iter().any(|a| a.id.as_deref() == Some(exp_id)) {
                let key = FindingKey::Id(exp_id.to_string());
                if !consumed.contains(&key) {
                    consumed.insert(key);
                    matched.push(exp.clone());
                }
                continue;
            }
        }

        // Fuzzy title match fallback - consume first unused produced finding
        for (idx, act) in actual.iter().enumerate() {
            let key = FindingKey::of(act, idx);
            if consumed.contains(&key) {
                continue;
            }
            if act.severity == exp.severity
                && title_similarity(&act.title, &exp.title) >= TITLE_SIMILARITY_THRESHOLD
            {
                consumed.insert(key);
                matched.push(exp.clone());
                break;
            }
        }
    }

    MatchResult { matched, consumed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Severity;

    fn finding(id: Option<&str>, title: &str, severity: Severity) -> Finding {
        Finding {
            id: id.map(String::from),
            title: title.to_string(),
            issue: "issue text".to_string(),
            severity,
            confidence: None,
            reviewer: None,
        }
    }

    #[test]
    fn test_exact_id_match_takes_priority() {
        let expected = vec![finding(
            Some("v3-test-001"),
            "Ground truth validity assumed",
            Severity::Critical,
        )];
        let actual = vec![finding(
            Some("v3-test-001"),
            "Completely different title",
            Severity::Minor,
        )];
        let result = match_findings(&actual, &expected);
        assert_eq!(result.matched.len(), 1);
        assert!(result
            .consumed
            .contains(&FindingKey::Id("v3-test-001".to_string())));
    }

    #[test]
    fn test_no_match_returns_empty() {
        let expected = vec![finding(
            Some("v3-test-001"),
            "Ground truth validity assumed",
            Severity::Critical,
        )];
        let actual = vec![finding(
            Some("v3-other-001"),
            "Something else entirely",
            Severity::Critical,
        )];
        let result = match_findings(&actual, &expected);
        assert!(result.matched.is_empty());
        assert!(result.consumed.is_empty());
    }

    #[test]
    fn test_fuzzy_title_match_near_duplicate() {
        // ~0.9 similarity, same severity, different ids
        let expected = vec![finding(
            Some("v3-test-001"),
            "Ground truth validity assumed",
            Severity::Critical,
        )];
        let actual = vec![finding(
            Some("v1-new-001"),
            "Ground truth validity assumption",
            Severity::Critical,
        )];
        let result = match_findings(&actual, &expected);
        assert_eq!(result.matched.len(), 1);
        assert!(result
            .consumed
            .contains(&FindingKey::Id("v1-new-001".to_string())));
    }

    #[test]
    fn test_similarity_below_threshold_never_matches() {
        let expected = vec![finding(None, "API key security undefined", Severity::Critical)];
        let actual = vec![finding(
            None,
            "Timeline for Phase 0 missing",
            Severity::Critical,
        )];
        assert!(
            title_similarity("API key security undefined", "Timeline for Phase 0 missing")
                < TITLE_SIMILARITY_THRESHOLD
        );
        let result = match_findings(&actual, &expected);
        assert!(result.matched.is_empty());
    }

    #[test]
    fn test_severity_mismatch_never_fuzzy_matches() {
        let expected = vec![finding(None, "Ground truth validity assumed", Severity::Critical)];
        let actual = vec![finding(
            None,
            "Ground truth validity assumed",
            Severity::Important,
        )];
        let result = match_findings(&actual, &expected);
        assert!(result.matched.is_empty());
    }

    #[test]
    fn test_one_actual_satisfies_at_most_one_expected() {
        // Two near-duplicate expected entries, one produced finding:
        // exactly one match, no double counting.
        let expected = vec![
            finding(Some("gt-001"), "Ground truth validity assumed", Severity::Critical),
            finding(Some("gt-002"), "Ground truth validity assumed!", Severity::Critical),
        ];
        let actual = vec![finding(
            Some("run-001"),
            "Ground truth validity assumption",
            Severity::Critical,
        )];
        let result = match_findings(&actual, &expected);
        assert_eq!(result.matched.len(), 1);
        assert_eq!(result.consumed.len(), 1);
    }

    #[test]
    fn test_partial_set_detection() {
        let expected = vec![
            finding(Some("a"), "Ground truth validity assumed", Severity::Critical),
            finding(Some("b"), "API key security undefined", Severity::Critical),
            finding(Some("c"), "Python environment constraints missing", Severity::Critical),
        ];
        let actual = vec![expected[0].clone(), expected[2].clone()];
        let result = match_findings(&actual, &expected);
        assert_eq!(result.matched.len(), 2);
        let ids: Vec<_> = result.matched.iter().filter_map(|f| f.id.as_deref()).collect();
        assert!(ids.contains(&"a"));
        assert!(ids.contains(&"c"));
    }

    #[test]
    fn test_missing_ids_degrade_to_title_matching() {
        let expected = vec![finding(None, "Ground truth validity assumed", Severity::Critical)];
        let actual = vec![finding(None, "Ground truth validity assumed", Severity::Critical)];
        let result = match_findings(&actual, &expected);
        assert_eq!(result.matched.len(), 1);
        assert!(result.consumed.contains(&FindingKey::Ordinal(0)));
    }

    #[test]
    fn test_tie_breaks_by_first_encountered() {
        let expected = vec![finding(None, "Ground truth validity assumed", Severity::Critical)];
        let actual = vec![
            finding(Some("run-001"), "Ground truth validity assumed", Severity::Critical),
            finding(Some("run-002"), "Ground truth validity assumed", Severity::Critical),
        ];
        let result = match_findings(&actual, &expected);
        assert!(result
            .consumed
            .contains(&FindingKey::Id("run-001".to_string())));
        assert!(!result
            .consumed
            .contains(&FindingKey::Id("run-002".to_string())));
    }

    #[test]
    fn test_title_similarity_identical() {
        assert_eq!(title_similarity("abc", "ABC"), 1.0);
        assert_eq!(title_similarity("", ""), 1.0);
        assert_eq!(title_similarity("abc", ""), 0.0);
    }

    #[test]
    fn test_title_similarity_example_ratio() {
        let ratio = title_similarity(
            "Ground truth validity assumed",
            "Ground truth validity assumption",
        );
        assert!(ratio >= 0.85 && ratio < 1.0, "ratio was {ratio}");
    }
}
