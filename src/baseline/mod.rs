//! Baseline regression comparison
//!
//! Compares the metric snapshot of a current eval run against a stored
//! baseline and classifies the run from the worst per-metric delta.
//!
//! Two physical input shapes normalize to the same snapshot type before
//! comparison:
//! - a flat run log: `results[0].scores[0].metadata.{recall,precision,f1}`
//! - a reductions array: `[0].samples[*].metadata.{recall,precision,f1}`,
//!   averaged per metric across samples
//!
//! Missing metric keys are descriptive errors naming the absent path -
//! never silently zeroed.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

use crate::scoring::MetricSnapshot;

/// Default worst-drop threshold for a FAIL verdict
pub const DEFAULT_FAIL_THRESHOLD: f64 = 0.10;
/// Default worst-drop threshold for a WARN verdict
pub const DEFAULT_WARN_THRESHOLD: f64 = 0.05;

/// Regression verdict for one baseline comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RegressionStatus {
    Pass,
    Warn,
    Fail,
}

impl RegressionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "PASS",
            Self::Warn => "WARN",
            Self::Fail => "FAIL",
        }
    }
}

impl std::fmt::Display for RegressionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated threshold pair; the warn band sits inside the fail band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub fail: f64,
    pub warn: f64,
}

impl Thresholds {
    pub fn new(fail: f64, warn: f64) -> Result<Self> {
        if warn >= fail {
            bail!("warn threshold ({warn}) must be below fail threshold ({fail})");
        }
        Ok(Self { fail, warn })
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            fail: DEFAULT_FAIL_THRESHOLD,
            warn: DEFAULT_WARN_THRESHOLD,
        }
    }
}

/// Per-metric difference between current and baseline
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricDelta {
    pub recall: f64,
    pub precision: f64,
    pub f1: f64,
}

impl MetricDelta {
    /// The largest regression - a drop is negative, so the minimum
    pub fn worst(&self) -> f64 {
        self.recall.min(self.precision).min(self.f1)
    }
}

/// Extract a snapshot from the flat run-log shape
pub fn extract_metrics(run: &Value) -> Result<MetricSnapshot> {
    let metadata = walk(run, &["results", "0", "scores", "0", "metadata"])?;
    snapshot_from_metadata(metadata, "results[0].scores[0].metadata")
}

/// Extract a snapshot from the reductions shape, averaging across samples
pub fn extract_metrics_averaged(reductions: &Value) -> Result<MetricSnapshot> {
    let samples = walk(reductions, &["0", "samples"])?
        .as_array()
        .context("reductions [0].samples is not an array")?;
    if samples.is_empty() {
        bail!("reductions [0].samples is empty - nothing to average");
    }

    let mut sum = MetricSnapshot {
        recall: 0.0,
        precision: 0.0,
        f1: 0.0,
    };
    for (idx, sample) in samples.iter().enumerate() {
        let path = format!("[0].samples[{idx}].metadata");
        let metadata = sample
            .get("metadata")
            .with_context(|| format!("run snapshot missing `{path}`"))?;
        let snapshot = snapshot_from_metadata(metadata, &path)?;
        sum.recall += snapshot.recall;
        sum.precision += snapshot.precision;
        sum.f1 += snapshot.f1;
    }

    let n = samples.len() as f64;
    Ok(MetricSnapshot {
        recall: sum.recall / n,
        precision: sum.precision / n,
        f1: sum.f1 / n,
    })
}

/// Load a snapshot file of either physical shape
///
/// A JSON array root is the reductions shape; an object root is the flat
/// run-log shape.
pub fn load_snapshot(path: &Path) -> Result<MetricSnapshot> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read snapshot: {:?}", path))?;
    let value: Value = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse snapshot: {:?}", path))?;

    let snapshot = if value.is_array() {
        extract_metrics_averaged(&value)
    } else {
        extract_metrics(&value)
    };
    snapshot.with_context(|| format!("Cannot extract metrics from {:?}", path))
}

/// Compare a current snapshot to a baseline
///
/// The verdict follows the worst per-metric delta:
/// FAIL if it drops past `fail`, WARN if past `warn`, else PASS.
pub fn compare(
    baseline: &MetricSnapshot,
    current: &MetricSnapshot,
    thresholds: &Thresholds,
) -> (RegressionStatus, MetricDelta) {
    let delta = MetricDelta {
        recall: current.recall - baseline.recall,
        precision: current.precision - baseline.precision,
        f1: current.f1 - baseline.f1,
    };
    let worst = delta.worst();

    let status = if worst < -thresholds.fail {
        RegressionStatus::Fail
    } else if worst < -thresholds.warn {
        RegressionStatus::Warn
    } else {
        RegressionStatus::Pass
    };

    (status, delta)
}

/// Walk a JSON path, failing with the full dotted path on a missing step
fn walk<'a>(value: &'a Value, steps: &[&str]) -> Result<&'a Value> {
    let mut current = value;
    let mut traversed = String::new();
    for step in steps {
        let next = match step.parse::<usize>() {
            Ok(idx) => {
                traversed.push_str(&format!("[{idx}]"));
                current.get(idx)
            }
            Err(_) => {
                if !traversed.is_empty() {
                    traversed.push('.');
                }
                traversed.push_str(step);
                current.get(*step)
            }
        };
        current = next.with_context(|| format!("run snapshot missing `{traversed}`"))?;
    }
    Ok(current)
}

fn snapshot_from_metadata(metadata: &Value, path: &str) -> Result<MetricSnapshot> {
    let metric = |key: &str| -> Result<f64> {
        metadata
            .get(key)
            .and_then(Value::as_f64)
            .with_context(|| format!("run snapshot missing `{path}.{key}`"))
    };
    Ok(MetricSnapshot {
        recall: metric("recall")?,
        precision: metric("precision")?,
        f1: metric("f1")?,
    })
}
