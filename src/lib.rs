//! Reviewer benchmark library
//!
//! Provides tools for evaluating AI design-review agents against curated
//! ground truth: finding extraction, deterministic matching, LLM-as-judge
//! scoring (recall and precision), and baseline regression comparison.

pub mod baseline;
pub mod config;
pub mod findings;
pub mod judge;
pub mod matcher;
pub mod scoring;
