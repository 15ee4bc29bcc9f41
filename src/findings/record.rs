//! Finding data contracts and dataset loading
//!
//! A dataset directory holds the curated ground truth for one evaluation
//! sample:
//!
//! ```text
//! dataset/
//!   critical_findings.jsonl   validated findings (validation_status field)
//!   metadata.json             design_doc_path + sample metadata
//!   must_find.jsonl           optional curated must-find subset
//! ```
//!
//! Only records with `validation_status == "real_flaw"` are eligible as
//! ground truth.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;

/// Finding severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Critical,
    Important,
    Minor,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Critical => "Critical",
            Self::Important => "Important",
            Self::Minor => "Minor",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Some(Self::Critical),
            "important" => Some(Self::Important),
            "minor" => Some(Self::Minor),
            _ => None,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single reported design flaw
///
/// Produced findings are ephemeral (fresh ids per run); expected findings
/// are persisted ground truth. Optional fields are explicit - a missing id
/// degrades matching to title/severity, it never errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    /// Run-local identifier; not stable across runs and may be absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Short title of the flaw
    pub title: String,
    /// Free-text description of the problem
    pub issue: String,
    /// Severity classification
    pub severity: Severity,
    /// Self-reported confidence (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
    /// Reviewer agent that produced or owns this finding
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
}

/// A curated must-find record: this exact flaw must always be surfaced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MustFindRecord {
    pub id: String,
    pub title: String,
    pub issue: String,
    pub severity: Severity,
    /// Minimum acceptable recall across N runs; carried through for
    /// multi-run aggregation, not enforced within a single run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_recall: Option<f64>,
}

impl MustFindRecord {
    /// View as a plain finding for judge prompting
    pub fn as_finding(&self) -> Finding {
        Finding {
            id: Some(self.id.clone()),
            title: self.title.clone(),
            issue: self.issue.clone(),
            severity: self.severity,
            confidence: None,
            reviewer: None,
        }
    }
}

/// Counts of findings per severity
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeverityDistribution {
    pub critical: usize,
    pub important: usize,
    pub minor: usize,
}

/// Count findings per severity level
pub fn count_by_severity(findings: &[Finding]) -> SeverityDistribution {
    let mut dist = SeverityDistribution::default();
    for f in findings {
        match f.severity {
            Severity::Critical => dist.critical += 1,
            Severity::Important => dist.important += 1,
            Severity::Minor => dist.minor += 1,
        }
    }
    dist
}

/// One evaluation sample: the source document plus its ground truth
#[derive(Debug, Clone)]
pub struct EvalSample {
    /// Full source document the reviewer was shown
    pub document: String,
    /// Validated expected findings (real flaws only)
    pub expected: Vec<Finding>,
    /// Curated must-find subset, if the dataset provides one
    pub must_find: Vec<MustFindRecord>,
    /// Severity distribution of the expected findings
    pub severity_distribution: SeverityDistribution,
}

impl EvalSample {
    /// Load a sample from a dataset directory
    ///
    /// Keeps only records with `type == "finding"` and
    /// `validation_status == "real_flaw"`, optionally restricted to one
    /// reviewer. A reviewer filter matching zero findings is an error -
    /// it means the filter value is wrong, not that the dataset is empty.
    pub fn load(dataset_dir: &Path, reviewer_filter: Option<&str>) -> Result<Self> {
        let findings_path = dataset_dir.join("critical_findings.jsonl");
        let records = read_jsonl(&findings_path)?;

        let mut expected = Vec::new();
        for (line_no, record) in records {
            if record.get("type").and_then(Value::as_str) != Some("finding") {
                continue;
            }
            if record.get("validation_status").and_then(Value::as_str) != Some("real_flaw") {
                continue;
            }
            if let Some(filter) = reviewer_filter {
                if record.get("reviewer").and_then(Value::as_str) != Some(filter) {
                    continue;
                }
            }
            let finding: Finding = serde_json::from_value(record).with_context(|| {
                format!(
                    "Invalid ground truth finding at {:?} line {}",
                    findings_path, line_no
                )
            })?;
            expected.push(finding);
        }

        if let Some(filter) = reviewer_filter {
            if expected.is_empty() {
                bail!(
                    "reviewer filter {:?} returned 0 findings from {:?}. \
                     Check that findings have a matching 'reviewer' field and \
                     validation_status='real_flaw'.",
                    filter,
                    findings_path
                );
            }
        }

        let metadata_path = dataset_dir.join("metadata.json");
        let metadata_text = std::fs::read_to_string(&metadata_path)
            .with_context(|| format!("Failed to read dataset metadata: {:?}", metadata_path))?;
        let metadata: Value = serde_json::from_str(&metadata_text)
            .with_context(|| format!("Failed to parse dataset metadata: {:?}", metadata_path))?;

        let doc_path_str = metadata
            .get("design_doc_path")
            .and_then(Value::as_str)
            .with_context(|| {
                format!("{:?} missing required key: design_doc_path", metadata_path)
            })?;
        let doc_path = Path::new(doc_path_str);
        let doc_path = if doc_path.is_absolute() {
            doc_path.to_path_buf()
        } else {
            dataset_dir.join(doc_path)
        };
        let document = std::fs::read_to_string(&doc_path)
            .with_context(|| format!("Failed to read design document: {:?}", doc_path))?;

        let must_find = load_must_find(dataset_dir)?;

        let severity_distribution = count_by_severity(&expected);
        tracing::debug!(
            expected = expected.len(),
            must_find = must_find.len(),
            "loaded eval sample from {:?}",
            dataset_dir
        );

        Ok(Self {
            document,
            expected,
            must_find,
            severity_distribution,
        })
    }
}

/// Load the optional must-find list; an absent file is an empty list
fn load_must_find(dataset_dir: &Path) -> Result<Vec<MustFindRecord>> {
    let path = dataset_dir.join("must_find.jsonl");
    if !path.exists() {
        return Ok(Vec::new());
    }
    let mut records = Vec::new();
    for (line_no, value) in read_jsonl(&path)? {
        let record: MustFindRecord = serde_json::from_value(value)
            .with_context(|| format!("Invalid must-find record at {:?} line {}", path, line_no))?;
        records.push(record);
    }
    Ok(records)
}

/// Read newline-delimited JSON, returning (line_number, value) pairs
///
/// Ground truth is curated data: a malformed line is a hard error naming
/// the file and line, unlike reviewer-output parsing which skips.
fn read_jsonl(path: &Path) -> Result<Vec<(usize, Value)>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read JSONL file: {:?}", path))?;

    let mut records = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Malformed JSON at {:?} line {}", path, idx + 1))?;
        records.push((idx + 1, value));
    }
    Ok(records)
}
