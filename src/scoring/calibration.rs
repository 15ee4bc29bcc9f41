//! Deterministic calibration scoring
//!
//! Validates finding detection against ground truth using the deterministic
//! matcher - no judge calls. Typically run over Critical-filtered output;
//! the severity filter is applied by the caller during extraction so the
//! choice stays explicit.

use serde::{Deserialize, Serialize};

use crate::findings::Finding;
use crate::matcher::{match_findings, FindingKey};

use super::metrics::calculate_metrics;

/// Default minimum recall for a passing calibration run
pub const DEFAULT_RECALL_THRESHOLD: f64 = 0.90;
/// Default minimum precision for a passing calibration run
pub const DEFAULT_PRECISION_THRESHOLD: f64 = 0.80;

/// Matcher-based calibration result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
    pub passes: bool,
    /// Matched expected findings (id, or title when no id)
    pub detected: Vec<String>,
    /// Expected findings with no matching produced finding
    pub missed: Vec<String>,
    /// Produced findings consumed by no match
    pub false_positives: Vec<String>,
}

fn label(finding: &Finding) -> String {
    finding
        .id
        .clone()
        .unwrap_or_else(|| finding.title.clone())
}

/// Score produced findings against ground truth deterministically
///
/// Thresholds gate the pass verdict: recall >= `recall_threshold` AND
/// precision >= `precision_threshold`.
pub fn calibrate(
    actual: &[Finding],
    expected: &[Finding],
    recall_threshold: f64,
    precision_threshold: f64,
) -> CalibrationReport {
    let result = match_findings(actual, expected);

    let (recall, precision, f1) =
        calculate_metrics(result.matched.len(), actual.len(), expected.len());
    let passes = recall >= recall_threshold && precision >= precision_threshold;

    let detected: Vec<String> = result.matched.iter().map(label).collect();
    let missed = expected
        .iter()
        .filter(|e| !result.matched.contains(e))
        .map(label)
        .collect();
    let false_positives = actual
        .iter()
        .enumerate()
        .filter(|(idx, f)| {
            let key = match &f.id {
                Some(id) => FindingKey::Id(id.clone()),
                None => FindingKey::Ordinal(*idx),
            };
            !result.consumed.contains(&key)
        })
        .map(|(_, f)| label(f))
        .collect();

    CalibrationReport {
        recall,
        precision,
        f1,
        passes,
        detected,
        missed,
        false_positives,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::findings::Severity;

    fn finding(id: &str, title: &str) -> Finding {
        Finding {
            id: Some(id.to_string()),
            title: title.to_string(),
            issue: "issue".to_string(),
            severity: Severity::Critical,
            confidence: None,
            reviewer: None,
        }
    }

    #[test]
    fn test_calibrate_perfect_run_passes() {
        let expected = vec![
            finding("a", "Ground truth validity assumed"),
            finding("b", "API key security undefined"),
        ];
        let report = calibrate(&expected, &expected, 0.90, 0.80);
        assert_eq!(report.recall, 1.0);
        assert_eq!(report.precision, 1.0);
        assert!(report.passes);
        assert!(report.missed.is_empty());
        assert!(report.false_positives.is_empty());
    }

    #[test]
    fn test_calibrate_missed_finding_fails_recall_gate() {
        let expected = vec![
            finding("a", "Ground truth validity assumed"),
            finding("b", "API key security undefined"),
        ];
        let actual = vec![expected[0].clone()];
        let report = calibrate(&actual, &expected, 0.90, 0.80);
        assert_eq!(report.recall, 0.5);
        assert!(!report.passes);
        assert_eq!(report.missed, vec!["b".to_string()]);
    }

    #[test]
    fn test_calibrate_reports_false_positives() {
        let expected = vec![finding("a", "Ground truth validity assumed")];
        let actual = vec![
            expected[0].clone(),
            finding("run-002", "Unrelated invented problem"),
        ];
        let report = calibrate(&actual, &expected, 0.90, 0.80);
        assert_eq!(report.precision, 0.5);
        assert_eq!(report.false_positives, vec!["run-002".to_string()]);
        assert!(!report.passes);
    }
}
