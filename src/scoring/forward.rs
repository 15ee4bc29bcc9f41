//! Forward scorer: recall over expected findings
//!
//! For each expected ground truth finding, asks the judge "did the reviewer
//! identify this flaw, possibly with different wording?". Judge calls for
//! independent findings are issued concurrently and joined; a single failed
//! call fails the whole sample - partial aggregation would skew recall.

use anyhow::Result;
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};

use crate::findings::{Finding, MustFindRecord};
use crate::judge::JudgeClient;

use super::metrics::ForwardResult;

/// Recall fragment produced by one forward scoring pass
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallReport {
    pub recall: f64,
    pub detected: usize,
    pub expected: usize,
    pub results: Vec<ForwardResult>,
    pub missed_titles: Vec<String>,
}

impl RecallReport {
    /// Vacuous success: an empty must-find list trivially succeeds
    fn vacuous() -> Self {
        Self {
            recall: 1.0,
            detected: 0,
            expected: 0,
            results: Vec::new(),
            missed_titles: Vec::new(),
        }
    }

    fn from_results(results: Vec<ForwardResult>) -> Self {
        let expected = results.len();
        let detected = results.iter().filter(|r| r.matched).count();
        let missed_titles = results
            .iter()
            .filter(|r| !r.matched)
            .map(|r| r.expected_title.clone())
            .collect();
        Self {
            recall: detected as f64 / expected as f64,
            detected,
            expected,
            results,
            missed_titles,
        }
    }
}

/// Scores recall by asking the judge once per expected finding
pub struct ForwardScorer {
    client: JudgeClient,
}

impl ForwardScorer {
    pub fn new(client: JudgeClient) -> Self {
        Self { client }
    }

    /// Score recall of the expected findings against the reviewer output
    ///
    /// Zero expected findings is a defined boundary, not an error: recall is
    /// vacuously 1.0 and the judge is never invoked.
    pub async fn score_recall(
        &self,
        expected: &[Finding],
        reviewer_output: &str,
    ) -> Result<RecallReport> {
        if expected.is_empty() {
            return Ok(RecallReport::vacuous());
        }

        let verdicts = try_join_all(
            expected
                .iter()
                .map(|finding| self.client.was_found(finding, reviewer_output)),
        )
        .await?;

        let results = expected
            .iter()
            .zip(verdicts)
            .map(|(finding, verdict)| ForwardResult {
                expected_id: finding.id.clone(),
                expected_title: finding.title.clone(),
                matched: verdict.is_positive,
                reasoning: verdict.rationale,
                min_recall: None,
            })
            .collect();

        let report = RecallReport::from_results(results);
        tracing::info!(
            detected = report.detected,
            expected = report.expected,
            recall = report.recall,
            "forward scoring complete"
        );
        Ok(report)
    }

    /// Score recall over the curated must-find list
    ///
    /// Same direction as `score_recall`, but sourced from the must-find
    /// subset; each result carries the record's `min_recall` annotation for
    /// downstream multi-run aggregation.
    pub async fn score_must_find(
        &self,
        must_find: &[MustFindRecord],
        reviewer_output: &str,
    ) -> Result<RecallReport> {
        if must_find.is_empty() {
            return Ok(RecallReport::vacuous());
        }

        let as_findings: Vec<Finding> = must_find.iter().map(MustFindRecord::as_finding).collect();
        let verdicts = try_join_all(
            as_findings
                .iter()
                .map(|finding| self.client.was_found(finding, reviewer_output)),
        )
        .await?;

        let results = must_find
            .iter()
            .zip(verdicts)
            .map(|(record, verdict)| ForwardResult {
                expected_id: Some(record.id.clone()),
                expected_title: record.title.clone(),
                matched: verdict.is_positive,
                reasoning: verdict.rationale,
                min_recall: record.min_recall,
            })
            .collect();

        let report = RecallReport::from_results(results);
        tracing::info!(
            found = report.detected,
            total = report.expected,
            "must-find scoring complete"
        );
        Ok(report)
    }
}
