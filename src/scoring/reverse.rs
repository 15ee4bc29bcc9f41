//! Reverse scorer: precision over produced findings
//!
//! Direction is reversed from the forward scorer: instead of "did you find
//! what we expected?", each finding the reviewer actually produced is judged
//! "is this genuine - real, document-visible, and not a false positive?".
//! The full source document is passed to every call, uncapped.

use anyhow::Result;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::findings::Finding;
use crate::judge::JudgeClient;

use super::metrics::{ConfidenceBreakdown, ConfidenceStratum, ReverseResult};

/// Self-reported confidence at or above this lands in the high stratum
pub const CONFIDENCE_STRATUM_THRESHOLD: u8 = 80;

/// Precision fragment produced by one reverse scoring pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrecisionReport {
    pub precision: f64,
    pub genuine: usize,
    pub total: usize,
    pub results: Vec<ReverseResult>,
    pub not_genuine_titles: Vec<String>,
    pub confidence_breakdown: ConfidenceBreakdown,
}

impl PrecisionReport {
    /// Vacuous success: nothing produced, nothing hallucinated
    fn vacuous() -> Self {
        Self {
            precision: 1.0,
            genuine: 0,
            total: 0,
            results: Vec::new(),
            not_genuine_titles: Vec::new(),
            confidence_breakdown: ConfidenceBreakdown::default(),
        }
    }
}

/// Scores precision by asking the judge once per produced finding
pub struct ReverseScorer {
    client: JudgeClient,
}

impl ReverseScorer {
    pub fn new(client: JudgeClient) -> Self {
        Self { client }
    }

    /// Score genuineness of every produced finding against the document
    ///
    /// Zero produced findings is a defined boundary, not an error: precision
    /// is vacuously 1.0 and the judge is never invoked.
    pub async fn score_precision(
        &self,
        produced: &[Finding],
        document: &str,
    ) -> Result<PrecisionReport> {
        if produced.is_empty() {
            return Ok(PrecisionReport::vacuous());
        }

        let verdicts = try_join_all(
            produced
                .iter()
                .map(|finding| self.client.is_genuine(finding, document)),
        )
        .await?;

        let results: Vec<ReverseResult> = produced
            .iter()
            .zip(&verdicts)
            .map(|(finding, verdict)| ReverseResult {
                finding_id: finding.id.clone(),
                finding_title: finding.title.clone(),
                is_genuine: verdict.is_positive,
                reasoning: verdict.rationale.clone(),
            })
            .collect();

        let total = produced.len();
        let genuine = results.iter().filter(|r| r.is_genuine).count();
        let not_genuine_titles = results
            .iter()
            .filter(|r| !r.is_genuine)
            .map(|r| r.finding_title.clone())
            .collect();

        let confidence_breakdown = stratify_by_confidence(produced, &results);

        let report = PrecisionReport {
            precision: genuine as f64 / total as f64,
            genuine,
            total,
            results,
            not_genuine_titles,
            confidence_breakdown,
        };
        tracing::info!(
            genuine = report.genuine,
            total = report.total,
            precision = report.precision,
            "reverse scoring complete"
        );
        Ok(report)
    }
}

/// Partition verdicts by self-reported confidence
///
/// Findings with no confidence field land in the low stratum.
fn stratify_by_confidence(produced: &[Finding], results: &[ReverseResult]) -> ConfidenceBreakdown {
    let mut high = (0usize, 0usize);
    let mut low = (0usize, 0usize);

    for (finding, result) in produced.iter().zip(results) {
        let stratum = if finding
            .confidence
            .map_or(false, |c| c >= CONFIDENCE_STRATUM_THRESHOLD)
        {
            &mut high
        } else {
            &mut low
        };
        stratum.0 += 1;
        if result.is_genuine {
            stratum.1 += 1;
        }
    }

    ConfidenceBreakdown {
        high_confidence: ConfidenceStratum::from_counts(high.0, high.1),
        low_confidence: ConfidenceStratum::from_counts(low.0, low.1),
    }
}
