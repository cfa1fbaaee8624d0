//! Error types at the provider seam.
//!
//! Embedding and generation calls return [`ProviderError`] instead of
//! swallowing failures into display strings; callers decide how to present
//! them. Application plumbing elsewhere uses `anyhow`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// The request never produced an HTTP response (DNS, TLS, timeout, ...).
    #[error("{provider} request failed: {source}")]
    Transport {
        provider: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The API answered with a non-success status.
    #[error("{provider} API error {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// The API answered 2xx but the body was not what we expected.
    #[error("invalid {provider} response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

impl ProviderError {
    pub fn invalid(provider: &'static str, message: impl Into<String>) -> Self {
        ProviderError::InvalidResponse {
            provider,
            message: message.into(),
        }
    }

    /// True for HTTP 429, which providers use to signal rate limiting.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::Api { status: 429, .. })
    }
}
