//! Per-finding judge calls
//!
//! Thin wrapper tying a transport backend to a prompting protocol. One call
//! per (finding, reference) pair; calls are stateless and independent, so
//! scorers can fan them out concurrently.

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::config::JudgeProtocol;
use crate::findings::Finding;

use super::backend::{GenerationConfig, JudgeBackend};
use super::protocol::{self, JudgeVerdict};

/// Default character cap on reviewer output in forward prompts
pub const DEFAULT_REVIEWER_OUTPUT_CAP: usize = 6000;

/// Token budget for direct (verdict-first) responses
const DIRECT_MAX_TOKENS: u32 = 150;
/// Token budget for reasoning responses, which write out their steps
const REASONING_MAX_TOKENS: u32 = 600;

/// Judge client: one verdict per finding
pub struct JudgeClient {
    backend: Arc<dyn JudgeBackend>,
    protocol: JudgeProtocol,
    reviewer_output_cap: usize,
}

impl JudgeClient {
    pub fn new(backend: Arc<dyn JudgeBackend>, protocol: JudgeProtocol) -> Self {
        Self {
            backend,
            protocol,
            reviewer_output_cap: DEFAULT_REVIEWER_OUTPUT_CAP,
        }
    }

    /// Override the forward-prompt cap on reviewer output
    ///
    /// This is a tunable prompt-size bound, not a correctness requirement:
    /// the per-finding text needed for "was this found?" is short relative
    /// to a full reviewer transcript.
    pub fn with_reviewer_output_cap(mut self, cap: usize) -> Self {
        self.reviewer_output_cap = cap;
        self
    }

    pub fn protocol(&self) -> JudgeProtocol {
        self.protocol
    }

    pub fn model(&self) -> &str {
        self.backend.model()
    }

    fn generation_config(&self) -> GenerationConfig {
        match self.protocol {
            JudgeProtocol::Direct => GenerationConfig::pinned(DIRECT_MAX_TOKENS),
            JudgeProtocol::Reasoning => GenerationConfig::pinned(REASONING_MAX_TOKENS),
        }
    }

    /// Forward direction: was this expected flaw conveyed by the reviewer
    /// output?
    pub async fn was_found(
        &self,
        expected: &Finding,
        reviewer_output: &str,
    ) -> Result<JudgeVerdict> {
        let output = truncate_chars(reviewer_output, self.reviewer_output_cap);
        let prompt = protocol::forward_prompt(expected, output);
        let completion = self
            .backend
            .complete(
                protocol::forward_system(self.protocol),
                &prompt,
                &self.generation_config(),
            )
            .await
            .with_context(|| format!("Judge call failed for expected finding: {}", expected.title))?;

        let verdict = protocol::parse_forward(self.protocol, &completion);
        tracing::debug!(
            matched = verdict.is_positive,
            title = %expected.title,
            "forward judge verdict"
        );
        Ok(verdict)
    }

    /// Reverse direction: is this produced finding genuine, given the full
    /// document?
    ///
    /// The document is always passed uncapped - a finding may reference any
    /// part of it, so truncation risks false negatives.
    pub async fn is_genuine(&self, finding: &Finding, document: &str) -> Result<JudgeVerdict> {
        let prompt = protocol::reverse_prompt(finding, document);
        let completion = self
            .backend
            .complete(
                protocol::reverse_system(self.protocol),
                &prompt,
                &self.generation_config(),
            )
            .await
            .with_context(|| format!("Judge call failed for produced finding: {}", finding.title))?;

        let verdict = protocol::parse_reverse(self.protocol, &completion);
        tracing::debug!(
            is_genuine = verdict.is_positive,
            title = %finding.title,
            "reverse judge verdict"
        );
        Ok(verdict)
    }
}

/// Truncate to at most `cap` characters on a char boundary
fn truncate_chars(text: &str, cap: usize) -> &str {
    match text.char_indices().nth(cap) {
        Some((byte_idx, _)) => &text[..byte_idx],
        None => text,
    }
}
