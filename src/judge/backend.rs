//! Judge transport
//!
//! Defines a common interface for judge completion backends and the
//! Anthropic messages API implementation used in production.

use anyhow::{bail, Context, Result};

/// Default completion API endpoint
pub const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Generation settings for one judge call
///
/// Temperature is pinned to 0 so verdicts for the same inputs are
/// reproducible across runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub max_tokens: u32,
    pub temperature: f32,
}

impl GenerationConfig {
    /// Config with pinned temperature 0
    pub fn pinned(max_tokens: u32) -> Self {
        Self {
            max_tokens,
            temperature: 0.0,
        }
    }
}

/// Unified trait for judge completion backends
///
/// A judge call is all-or-nothing: it either returns completion text or
/// raises. Timeouts and retries belong to the transport, not the scoring
/// engine.
#[async_trait::async_trait]
pub trait JudgeBackend: Send + Sync {
    /// Model identifier for reporting
    fn model(&self) -> &str;

    /// Generate completion text for (system instructions, task prompt)
    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String>;
}

/// Judge backend calling the Anthropic messages API
#[derive(Debug)]
pub struct AnthropicBackend {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl AnthropicBackend {
    /// Create a backend reading the API key from `ANTHROPIC_API_KEY`
    pub fn new(model: impl Into<String>) -> Result<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY").unwrap_or_default();
        Self::with_key(model, api_key, ANTHROPIC_API_URL)
    }

    /// Create a backend with an explicit key and endpoint
    pub fn with_key(
        model: impl Into<String>,
        api_key: impl Into<String>,
        api_url: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            bail!("ANTHROPIC_API_KEY not set. The semantic judge requires API access.");
        }
        Ok(Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key,
            model: model.into(),
        })
    }
}

#[async_trait::async_trait]
impl JudgeBackend for AnthropicBackend {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        system: &str,
        prompt: &str,
        config: &GenerationConfig,
    ) -> Result<String> {
        let request_body = serde_json::json!({
            "model": self.model,
            "max_tokens": config.max_tokens,
            "temperature": config.temperature,
            "system": system,
            "messages": [
                {
                    "role": "user",
                    "content": prompt
                }
            ]
        });

        let response = self
            .client
            .post(&self.api_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .context("Judge API request failed")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            bail!("Judge API error ({status}): {error_text}");
        }

        let response_json: serde_json::Value =
            response.json().await.context("Judge API returned non-JSON body")?;

        let content = response_json["content"][0]["text"]
            .as_str()
            .context("Judge API response missing content[0].text")?;

        Ok(content.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_config_pins_temperature() {
        let config = GenerationConfig::pinned(100);
        assert_eq!(config.max_tokens, 100);
        assert_eq!(config.temperature, 0.0);
    }

    #[test]
    fn test_backend_requires_api_key() {
        let err = AnthropicBackend::with_key("model", "", ANTHROPIC_API_URL).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_backend_reports_model() {
        let backend =
            AnthropicBackend::with_key("test-model", "test-key", ANTHROPIC_API_URL).unwrap();
        assert_eq!(backend.model(), "test-model");
    }
}
