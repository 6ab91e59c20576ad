//! Text generation providers for module summaries and architecture
//! synthesis.
//!
//! Two model tiers are configured: a fast, inexpensive model for the many
//! per-module summaries and a stronger model for the single synthesis
//! call. Providers:
//!
//! | `generation.provider` | Implementation | Endpoint |
//! |-----------------------|----------------|----------|
//! | `"disabled"` | [`DisabledGenerator`] | none |
//! | `"anthropic"` | [`AnthropicGenerator`] | `POST {url}/v1/messages` |
//! | `"openai"` | [`OpenAIGenerator`] | `POST {url}/chat/completions` |

use anyhow::{bail, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use crate::config::GenerationConfig;
use crate::http::post_json_with_retry;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Fast,
    Strong,
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub tier: ModelTier,
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: u32,
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    fn is_enabled(&self) -> bool {
        true
    }

    /// Generate a completion for `request`. An empty completion is an error.
    async fn generate(&self, request: &GenerationRequest) -> Result<String>;
}

pub struct DisabledGenerator;

#[async_trait]
impl TextGenerator for DisabledGenerator {
    fn is_enabled(&self) -> bool {
        false
    }

    async fn generate(&self, _request: &GenerationRequest) -> Result<String> {
        bail!("Text generation is disabled")
    }
}

/// Model name per tier.
struct Models {
    fast: String,
    strong: String,
}

impl Models {
    fn from_config(config: &GenerationConfig) -> Result<Self> {
        let fast = config
            .fast_model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.fast_model required"))?;
        let strong = config
            .strong_model
            .clone()
            .ok_or_else(|| anyhow::anyhow!("generation.strong_model required"))?;
        Ok(Self { fast, strong })
    }

    fn for_tier(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Strong => &self.strong,
        }
    }
}

fn api_key(config: &GenerationConfig) -> Result<String> {
    std::env::var(config.api_key_var())
        .map_err(|_| anyhow::anyhow!("{} environment variable not set", config.api_key_var()))
}

fn http_client(config: &GenerationConfig) -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?)
}

// ============ Anthropic ============

pub struct AnthropicGenerator {
    models: Models,
    url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl AnthropicGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            models: Models::from_config(config)?,
            url: config
                .url
                .as_deref()
                .unwrap_or("https://api.anthropic.com")
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key(config)?,
            max_retries: config.max_retries,
            client: http_client(config)?,
        })
    }
}

#[async_trait]
impl TextGenerator for AnthropicGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let mut body = serde_json::json!({
            "model": self.models.for_tier(request.tier),
            "max_tokens": request.max_tokens,
            "messages": [{
                "role": "user",
                "content": request.prompt
            }],
        });
        if let Some(system) = &request.system {
            body["system"] = Value::String(system.clone());
        }

        let json = post_json_with_retry(
            &self.client,
            &format!("{}/v1/messages", self.url),
            &[
                ("x-api-key", self.api_key.as_str()),
                ("anthropic-version", ANTHROPIC_VERSION),
            ],
            &body,
            self.max_retries,
            "Anthropic API",
        )
        .await?;

        non_empty(parse_anthropic_response(&json))
    }
}

/// Concatenate the `text` blocks of a Messages API response.
fn parse_anthropic_response(json: &Value) -> String {
    json.get("content")
        .and_then(|c| c.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| b.get("type").and_then(|t| t.as_str()) == Some("text"))
                .filter_map(|b| b.get("text").and_then(|t| t.as_str()))
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
        .trim()
        .to_string()
}

// ============ OpenAI ============

pub struct OpenAIGenerator {
    models: Models,
    url: String,
    api_key: String,
    max_retries: u32,
    client: reqwest::Client,
}

impl OpenAIGenerator {
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        Ok(Self {
            models: Models::from_config(config)?,
            url: config
                .url
                .as_deref()
                .unwrap_or("https://api.openai.com/v1")
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key(config)?,
            max_retries: config.max_retries,
            client: http_client(config)?,
        })
    }
}

#[async_trait]
impl TextGenerator for OpenAIGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<String> {
        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(serde_json::json!({"role": "system", "content": system}));
        }
        messages.push(serde_json::json!({"role": "user", "content": request.prompt}));

        let body = serde_json::json!({
            "model": self.models.for_tier(request.tier),
            "max_tokens": request.max_tokens,
            "messages": messages,
        });
        let auth = format!("Bearer {}", self.api_key);

        let json = post_json_with_retry(
            &self.client,
            &format!("{}/chat/completions", self.url),
            &[("Authorization", auth.as_str())],
            &body,
            self.max_retries,
            "OpenAI API",
        )
        .await?;

        non_empty(parse_openai_response(&json))
    }
}

fn parse_openai_response(json: &Value) -> String {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|arr| arr.first())
        .and_then(|choice| choice.get("message"))
        .and_then(|msg| msg.get("content"))
        .and_then(|t| t.as_str())
        .unwrap_or("")
        .trim()
        .to_string()
}

fn non_empty(text: String) -> Result<String> {
    if text.is_empty() {
        bail!("Model returned an empty completion");
    }
    Ok(text)
}

pub fn create_generator(config: &GenerationConfig) -> Result<Arc<dyn TextGenerator>> {
    match config.provider.as_str() {
        "disabled" => Ok(Arc::new(DisabledGenerator)),
        "anthropic" => Ok(Arc::new(AnthropicGenerator::new(config)?)),
        "openai" => Ok(Arc::new(OpenAIGenerator::new(config)?)),
        other => bail!("Unknown generation provider: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anthropic_text_blocks_are_joined_and_trimmed() {
        let json = serde_json::json!({
            "content": [
                {"type": "text", "text": "  Handles billing. "},
                {"type": "tool_use", "id": "x"},
                {"type": "text", "text": "Exports charge."}
            ]
        });
        assert_eq!(
            parse_anthropic_response(&json),
            "Handles billing. Exports charge."
        );
    }

    #[test]
    fn openai_first_choice_is_used() {
        let json = serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": "Renders the nav bar.\n"}}]
        });
        assert_eq!(parse_openai_response(&json), "Renders the nav bar.");
    }

    #[test]
    fn empty_completion_is_an_error() {
        assert!(non_empty(parse_openai_response(&serde_json::json!({}))).is_err());
    }

    #[test]
    fn tiers_pick_their_model() {
        let models = Models {
            fast: "small".into(),
            strong: "large".into(),
        };
        assert_eq!(models.for_tier(ModelTier::Fast), "small");
        assert_eq!(models.for_tier(ModelTier::Strong), "large");
    }

    #[tokio::test]
    async fn disabled_generator_is_reported_disabled() {
        let generator = create_generator(&GenerationConfig::default()).unwrap();
        assert!(!generator.is_enabled());
        let request = GenerationRequest {
            tier: ModelTier::Fast,
            system: None,
            prompt: "hi".into(),
            max_tokens: 10,
        };
        assert!(generator.generate(&request).await.is_err());
    }
}
