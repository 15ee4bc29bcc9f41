//! Finding records and reviewer-output extraction
//!
//! Findings come from two places with different trust levels:
//!
//! - **Ground truth**: human-validated JSONL records loaded from a dataset
//!   directory. Malformed lines are hard errors (curated data).
//! - **Reviewer output**: raw completion text parsed leniently. Malformed
//!   lines are skipped (model output is not guaranteed well-formed).

pub mod extract;
pub mod record;

pub use extract::extract_findings;
pub use record::{
    EvalSample, Finding, MustFindRecord, Severity, SeverityDistribution,
};
