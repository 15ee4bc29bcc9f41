//! Semantic judge abstraction
//!
//! One judge call per (finding, reference) pair renders a binary verdict
//! plus rationale. The transport is a trait so scoring can run against the
//! real completion API or a mock:
//! - `backend` - transport trait + Anthropic messages API implementation
//! - `protocol` - prompt construction and verdict parsing (direct and
//!   reasoning-first)
//! - `client` - per-finding judge calls used by the scorers

pub mod backend;
pub mod client;
pub mod protocol;

pub use backend::{AnthropicBackend, GenerationConfig, JudgeBackend, ANTHROPIC_API_URL};
pub use client::JudgeClient;
pub use protocol::JudgeVerdict;
