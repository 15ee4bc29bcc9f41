//! Metric math and report wire types

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::forward::RecallReport;
use super::reverse::PrecisionReport;

/// Calculate recall, precision, F1 from raw counts
///
/// Pure ratio helper: a zero denominator yields 0.0. The scorers define the
/// vacuous boundary values (empty expected set → recall 1.0, empty produced
/// set → precision 1.0) before ever reaching this function.
pub fn calculate_metrics(detected: usize, actual: usize, expected: usize) -> (f64, f64, f64) {
    let recall = if expected > 0 {
        detected as f64 / expected as f64
    } else {
        0.0
    };
    let precision = if actual > 0 {
        detected as f64 / actual as f64
    } else {
        0.0
    };
    let f1 = f1_score(precision, recall);
    (recall, precision, f1)
}

/// Harmonic mean of precision and recall; 0 when both are 0
pub fn f1_score(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// Aggregated metrics for one evaluation sample or run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
}

/// Per-expected-finding forward judge outcome
///
/// Serialized with the same `finding_id`/`finding_title` keys as reverse
/// results so `judge_results` stays uniform on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForwardResult {
    #[serde(
        rename = "finding_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub expected_id: Option<String>,
    #[serde(rename = "finding_title")]
    pub expected_title: String,
    pub matched: bool,
    pub reasoning: String,
    /// Declared minimum-acceptable-recall annotation, carried through for
    /// multi-run aggregation; not enforced within a single run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_recall: Option<f64>,
}

/// Per-produced-finding reverse judge outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReverseResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finding_id: Option<String>,
    pub finding_title: String,
    pub is_genuine: bool,
    pub reasoning: String,
}

/// One direction-tagged judge result for the combined report
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JudgeResultRecord {
    Forward(ForwardResult),
    Reverse(ReverseResult),
}

/// Precision within one self-reported-confidence stratum
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceStratum {
    pub total: usize,
    pub genuine: usize,
    /// Absent when the stratum is empty
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<f64>,
}

impl ConfidenceStratum {
    pub fn from_counts(total: usize, genuine: usize) -> Self {
        Self {
            total,
            genuine,
            precision: (total > 0).then(|| genuine as f64 / total as f64),
        }
    }
}

/// Calibration diagnostic: precision split by self-reported confidence
///
/// Well-calibrated self-confidence should correlate with judge-confirmed
/// genuineness. Reported, not enforced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceBreakdown {
    /// Findings with self-reported confidence >= 80
    pub high_confidence: ConfidenceStratum,
    /// Findings below 80, or with no confidence reported
    pub low_confidence: ConfidenceStratum,
}

/// Sample-level evaluation report (wire shape)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalReport {
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
    pub detected: usize,
    pub expected: usize,
    pub judge_results: Vec<JudgeResultRecord>,
    pub missed_titles: Vec<String>,
    pub confidence_breakdown: ConfidenceBreakdown,
}

impl EvalReport {
    /// Fold forward and reverse scorer fragments into one report
    pub fn from_scores(recall: &RecallReport, precision: &PrecisionReport) -> Self {
        let f1 = f1_score(precision.precision, recall.recall);
        let judge_results = recall
            .results
            .iter()
            .cloned()
            .map(JudgeResultRecord::Forward)
            .chain(
                precision
                    .results
                    .iter()
                    .cloned()
                    .map(JudgeResultRecord::Reverse),
            )
            .collect();

        Self {
            recall: recall.recall,
            precision: precision.precision,
            f1,
            detected: recall.detected,
            expected: recall.expected,
            judge_results,
            missed_titles: recall.missed_titles.clone(),
            confidence_breakdown: precision.confidence_breakdown,
        }
    }

    pub fn snapshot(&self) -> MetricSnapshot {
        MetricSnapshot {
            recall: self.recall,
            precision: self.precision,
            f1: self.f1,
        }
    }
}

/// Wrap a report in the run-log shape consumed by baseline comparison
///
/// Produces `{"results": [{"scores": [{"metadata": <report>}]}],
/// "metadata": <run metadata>}` so a scoring run can be compared directly.
pub fn wrap_run_log(report: &EvalReport, run_metadata: Value) -> Value {
    serde_json::json!({
        "results": [
            {
                "scores": [
                    {
                        "metadata": report
                    }
                ]
            }
        ],
        "metadata": run_metadata
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_metrics_perfect() {
        let (recall, precision, f1) = calculate_metrics(3, 3, 3);
        assert_eq!(recall, 1.0);
        assert_eq!(precision, 1.0);
        assert_eq!(f1, 1.0);
    }

    #[test]
    fn test_calculate_metrics_half_recall() {
        let (recall, precision, f1) = calculate_metrics(1, 1, 2);
        assert_eq!(recall, 0.5);
        assert_eq!(precision, 1.0);
        assert!((f1 - 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_metrics_with_false_positives() {
        let (recall, precision, _) = calculate_metrics(2, 4, 2);
        assert_eq!(recall, 1.0);
        assert_eq!(precision, 0.5);
    }

    #[test]
    fn test_calculate_metrics_zero_denominators() {
        let (recall, precision, f1) = calculate_metrics(0, 0, 3);
        assert_eq!(recall, 0.0);
        assert_eq!(precision, 0.0);
        assert_eq!(f1, 0.0);

        let (recall, precision, f1) = calculate_metrics(0, 0, 0);
        assert_eq!((recall, precision, f1), (0.0, 0.0, 0.0));
    }

    #[test]
    fn test_confidence_stratum_empty_has_no_precision() {
        let stratum = ConfidenceStratum::from_counts(0, 0);
        assert_eq!(stratum.precision, None);

        let stratum = ConfidenceStratum::from_counts(4, 3);
        assert_eq!(stratum.precision, Some(0.75));
    }

    #[test]
    fn test_wrap_run_log_shape() {
        let report = EvalReport {
            recall: 0.5,
            precision: 1.0,
            f1: 2.0 / 3.0,
            detected: 1,
            expected: 2,
            judge_results: vec![],
            missed_titles: vec!["Missed".to_string()],
            confidence_breakdown: ConfidenceBreakdown::default(),
        };
        let log = wrap_run_log(&report, serde_json::json!({"model": "m"}));
        assert_eq!(
            log["results"][0]["scores"][0]["metadata"]["recall"]
                .as_f64()
                .unwrap(),
            0.5
        );
        assert_eq!(log["metadata"]["model"], "m");
    }
}
