//! Configuration for reviewer evaluation
//!
//! Defines the eval.toml schema and the JudgeProtocol enum.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Judge prompting protocol
///
/// - `Direct`: verdict token on the first line, one sentence of rationale
/// - `Reasoning`: chain-of-thought steps followed by a final `Verdict:` line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JudgeProtocol {
    /// Single-turn, verdict-first prompting (cheap, fast)
    #[default]
    Direct,

    /// Reasoning-first prompting: evidence location, category check,
    /// grounding check, context-dependence check, then a verdict line
    Reasoning,
}

impl JudgeProtocol {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Reasoning => "reasoning",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "direct" => Some(Self::Direct),
            "reasoning" | "cot" | "geval" => Some(Self::Reasoning),
            _ => None,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Direct => "Verdict-first single-turn judging",
            Self::Reasoning => "Chain-of-thought judging with a final Verdict line",
        }
    }
}

/// Judge model settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JudgeModelConfig {
    /// Model identifier sent to the completion API
    #[serde(default = "default_judge_model")]
    pub model: String,

    /// Completion API endpoint
    #[serde(default = "default_api_url")]
    pub api_url: String,
}

fn default_judge_model() -> String {
    "claude-3-haiku-20240307".to_string()
}

fn default_api_url() -> String {
    crate::judge::ANTHROPIC_API_URL.to_string()
}

impl Default for JudgeModelConfig {
    fn default() -> Self {
        Self {
            model: default_judge_model(),
            api_url: default_api_url(),
        }
    }
}

/// Regression thresholds for baseline comparison
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Worst metric drop beyond this fails the run
    #[serde(default = "default_fail_threshold")]
    pub fail: f64,

    /// Worst metric drop beyond this (but within fail) warns
    #[serde(default = "default_warn_threshold")]
    pub warn: f64,
}

fn default_fail_threshold() -> f64 {
    0.10
}

fn default_warn_threshold() -> f64 {
    0.05
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            fail: default_fail_threshold(),
            warn: default_warn_threshold(),
        }
    }
}

/// Evaluation configuration loaded from eval.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvalConfig {
    /// Judge model settings
    #[serde(default)]
    pub judge: JudgeModelConfig,

    /// Judge prompting protocol
    #[serde(default)]
    pub protocol: JudgeProtocol,

    /// Character cap on the reviewer output passed into forward judge
    /// prompts. The source document is never capped.
    #[serde(default = "default_reviewer_output_cap")]
    pub reviewer_output_cap: usize,

    /// Regression thresholds
    #[serde(default)]
    pub thresholds: ThresholdConfig,
}

fn default_reviewer_output_cap() -> usize {
    6000
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            judge: JudgeModelConfig::default(),
            protocol: JudgeProtocol::default(),
            reviewer_output_cap: default_reviewer_output_cap(),
            thresholds: ThresholdConfig::default(),
        }
    }
}

impl EvalConfig {
    /// Load config from TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read eval config: {:?}", path))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse eval config: {:?}", path))?;
        Ok(config)
    }

    /// Load from the given location if it exists, otherwise return defaults
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            return Self::load(path);
        }
        Ok(Self::default())
    }

    /// Save config to TOML file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_from_str() {
        assert_eq!(JudgeProtocol::from_str("direct"), Some(JudgeProtocol::Direct));
        assert_eq!(JudgeProtocol::from_str("Reasoning"), Some(JudgeProtocol::Reasoning));
        assert_eq!(JudgeProtocol::from_str("geval"), Some(JudgeProtocol::Reasoning));
        assert_eq!(JudgeProtocol::from_str("unknown"), None);
    }

    #[test]
    fn test_default_config() {
        let config = EvalConfig::default();
        assert_eq!(config.protocol, JudgeProtocol::Direct);
        assert_eq!(config.reviewer_output_cap, 6000);
        assert!(config.thresholds.warn < config.thresholds.fail);
    }

    #[test]
    fn test_config_toml_roundtrip() {
        let config = EvalConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: EvalConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.judge.model, config.judge.model);
        assert_eq!(parsed.protocol, config.protocol);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let parsed: EvalConfig = toml::from_str("protocol = \"reasoning\"").unwrap();
        assert_eq!(parsed.protocol, JudgeProtocol::Reasoning);
        assert_eq!(parsed.reviewer_output_cap, 6000);
    }
}
