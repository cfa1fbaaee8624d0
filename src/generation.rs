//! Answer generation through a remote language model.
//!
//! One [`Generator::generate`] call per chat turn: a single prompt in, the
//! model's text out. No streaming, no tool calls, no multi-step reasoning.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{Config, Credentials, ProviderKind};
use crate::error::ProviderError;
use crate::provider::{gemini_model_path, ProviderContext};

#[async_trait]
pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError>;
}

// ============ Gemini ============

/// Calls `POST /v1beta/{model}:generateContent`.
pub struct GeminiGenerator {
    ctx: ProviderContext,
    model: String,
}

impl GeminiGenerator {
    pub fn new(ctx: ProviderContext, model: &str) -> Self {
        Self {
            ctx,
            model: gemini_model_path(model),
        }
    }
}

#[async_trait]
impl Generator for GeminiGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "contents": [{
                "role": "user",
                "parts": [{ "text": prompt }]
            }]
        });
        let url = format!("{}/v1beta/{}:generateContent", self.ctx.base_url, self.model);

        let json = self.ctx.post_json(&url, &body).await?;
        parse_gemini_response(&json)
    }
}

/// Concatenate the text parts of the first candidate.
///
/// A response without candidates (e.g. a blocked prompt) is an error,
/// reported with the `promptFeedback.blockReason` when present.
fn parse_gemini_response(json: &Value) -> Result<String, ProviderError> {
    let candidate = json
        .get("candidates")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .ok_or_else(|| {
            let reason = json
                .pointer("/promptFeedback/blockReason")
                .and_then(|r| r.as_str())
                .unwrap_or("no candidates returned");
            ProviderError::invalid("gemini", reason)
        })?;

    let parts = candidate
        .pointer("/content/parts")
        .and_then(|p| p.as_array())
        .ok_or_else(|| ProviderError::invalid("gemini", "candidate has no content parts"))?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();

    if text.is_empty() {
        return Err(ProviderError::invalid("gemini", "candidate has no text"));
    }
    Ok(text)
}

// ============ OpenAI ============

/// Calls an OpenAI-compatible `POST /v1/chat/completions`.
pub struct OpenAIGenerator {
    ctx: ProviderContext,
    model: String,
}

impl OpenAIGenerator {
    pub fn new(ctx: ProviderContext, model: &str) -> Self {
        Self {
            ctx,
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl Generator for OpenAIGenerator {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });
        let url = format!("{}/v1/chat/completions", self.ctx.base_url);

        let json = self.ctx.post_json(&url, &body).await?;
        parse_openai_response(&json)
    }
}

fn parse_openai_response(json: &Value) -> Result<String, ProviderError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ProviderError::invalid("openai", "missing choices[0].message.content"))
}

/// Create the configured [`Generator`].
pub fn create_generator(config: &Config, credentials: &Credentials) -> Result<Box<dyn Generator>> {
    let ctx = ProviderContext::new(config, credentials.api_key())?;
    let model = config.generation.model(config.provider.kind);

    Ok(match config.provider.kind {
        ProviderKind::Gemini => Box::new(GeminiGenerator::new(ctx, model)),
        ProviderKind::OpenAI => Box::new(OpenAIGenerator::new(ctx, model)),
    })
}
