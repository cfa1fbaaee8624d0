//! Shared HTTP plumbing for the remote embedding and generation APIs.
//!
//! Each call is a single attempt. There is no retry or backoff: a failed
//! request surfaces as a [`ProviderError`] and the caller aborts the
//! current ingestion run or chat turn.

use std::time::Duration;

use anyhow::Result;
use serde_json::Value;

use crate::config::{Config, ProviderKind};
use crate::error::ProviderError;

/// Everything a provider implementation needs to issue requests.
#[derive(Clone)]
pub struct ProviderContext {
    pub kind: ProviderKind,
    pub base_url: String,
    pub api_key: String,
    pub client: reqwest::Client,
}

impl ProviderContext {
    pub fn new(config: &Config, api_key: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.provider.timeout_secs()))
            .build()?;

        Ok(Self {
            kind: config.provider.kind,
            base_url: config.provider.base_url().to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    /// POST `body` to `url` with the provider's auth header and decode the
    /// JSON response.
    pub async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ProviderError> {
        let provider = self.kind.as_str();
        let request = self.client.post(url).json(body);
        let request = match self.kind {
            ProviderKind::Gemini => request.header("x-goog-api-key", &self.api_key),
            ProviderKind::OpenAI => request.bearer_auth(&self.api_key),
        };

        tracing::debug!(provider, url, "sending provider request");

        let response = request
            .send()
            .await
            .map_err(|source| ProviderError::Transport { provider, source })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider,
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<Value>()
            .await
            .map_err(|e| ProviderError::invalid(provider, e.to_string()))
    }
}

/// Gemini addresses models as `models/<name>`; accept either spelling.
pub fn gemini_model_path(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{}", model)
    }
}

/// Read a JSON number array as an embedding vector.
pub(crate) fn parse_vector(provider: &'static str, value: &Value) -> Result<Vec<f32>, ProviderError> {
    let values = value
        .as_array()
        .ok_or_else(|| ProviderError::invalid(provider, "embedding is not an array"))?;

    values
        .iter()
        .map(|v| {
            v.as_f64()
                .map(|f| f as f32)
                .ok_or_else(|| ProviderError::invalid(provider, "embedding contains a non-number"))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_gemini_model_path() {
        assert_eq!(
            gemini_model_path("models/text-embedding-004"),
            "models/text-embedding-004"
        );
        assert_eq!(gemini_model_path("gemini-2.5-flash"), "models/gemini-2.5-flash");
    }

    #[test]
    fn test_parse_vector() {
        let v = parse_vector("gemini", &json!([0.5, -1.0, 2])).unwrap();
        assert_eq!(v, vec![0.5, -1.0, 2.0]);
        assert!(parse_vector("gemini", &json!({"values": []})).is_err());
        assert!(parse_vector("gemini", &json!([0.5, "x"])).is_err());
    }
}
