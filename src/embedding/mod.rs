//! Embedding provider abstraction and implementations.
//!
//! Defines the [`Embedder`] trait and the remote implementations:
//! - **[`GeminiEmbedder`]**: Gemini `batchEmbedContents`, with distinct
//!   task types for stored documents and incoming queries.
//! - **[`OpenAIEmbedder`]**: OpenAI-compatible `POST /v1/embeddings`. The
//!   API has no task types, so both modes encode identically.
//!
//! Also provides the vector utilities the store builds on:
//! - [`cosine_similarity`]: similarity between two embedding vectors
//! - [`vec_to_blob`] / [`blob_to_vec`]: little-endian `f32` BLOB encoding
//!
//! Inputs are sent in sequential batches of `embedding.batch_size`. A failed
//! batch fails the whole call; nothing is retried.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::{json, Value};

use crate::config::{Config, Credentials, ProviderKind};
use crate::error::ProviderError;
use crate::provider::{gemini_model_path, parse_vector, ProviderContext};

/// Which role the embedded text plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedMode {
    /// A chunk that will be stored and searched.
    Document,
    /// A user question that will be searched with.
    Query,
}

impl EmbedMode {
    pub fn gemini_task_type(&self) -> &'static str {
        match self {
            EmbedMode::Document => "RETRIEVAL_DOCUMENT",
            EmbedMode::Query => "RETRIEVAL_QUERY",
        }
    }
}

/// Trait for embedding backends.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Returns the model identifier (e.g. `"models/text-embedding-004"`).
    fn model_name(&self) -> &str;

    /// Embed `texts`, returning exactly one vector per input, in order.
    async fn embed(&self, texts: &[String], mode: EmbedMode)
        -> Result<Vec<Vec<f32>>, ProviderError>;
}

/// Embed a single question in [`EmbedMode::Query`].
pub async fn embed_query(embedder: &dyn Embedder, text: &str) -> Result<Vec<f32>, ProviderError> {
    embedder
        .embed(&[text.to_string()], EmbedMode::Query)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| {
            ProviderError::invalid(
                "embedding",
                format!("no query vector returned by {}", embedder.model_name()),
            )
        })
}

fn check_count(
    provider: &'static str,
    expected: usize,
    embeddings: &[Vec<f32>],
) -> Result<(), ProviderError> {
    if embeddings.len() != expected {
        return Err(ProviderError::invalid(
            provider,
            format!(
                "expected {} embeddings, got {}",
                expected,
                embeddings.len()
            ),
        ));
    }
    Ok(())
}

// ============ Gemini ============

/// Embedding provider using the Gemini API.
///
/// Calls `POST /v1beta/{model}:batchEmbedContents` with one request entry
/// per text, tagged `RETRIEVAL_DOCUMENT` or `RETRIEVAL_QUERY`.
pub struct GeminiEmbedder {
    ctx: ProviderContext,
    model: String,
    batch_size: usize,
}

impl GeminiEmbedder {
    pub fn new(ctx: ProviderContext, model: &str, batch_size: usize) -> Self {
        Self {
            ctx,
            model: gemini_model_path(model),
            batch_size: batch_size.max(1),
        }
    }

    async fn embed_batch(
        &self,
        texts: &[String],
        mode: EmbedMode,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": self.model,
                    "content": { "parts": [{ "text": text }] },
                    "taskType": mode.gemini_task_type(),
                })
            })
            .collect();
        let body = json!({ "requests": requests });
        let url = format!(
            "{}/v1beta/{}:batchEmbedContents",
            self.ctx.base_url, self.model
        );

        let json = self.ctx.post_json(&url, &body).await?;
        parse_gemini_response(&json)
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(
        &self,
        texts: &[String],
        mode: EmbedMode,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(batch, mode).await?);
        }
        check_count("gemini", texts.len(), &out)?;
        Ok(out)
    }
}

/// Extract `embeddings[].values` from a `batchEmbedContents` response.
fn parse_gemini_response(json: &Value) -> Result<Vec<Vec<f32>>, ProviderError> {
    let embeddings = json
        .get("embeddings")
        .and_then(|e| e.as_array())
        .ok_or_else(|| ProviderError::invalid("gemini", "missing embeddings array"))?;

    embeddings
        .iter()
        .map(|item| {
            let values = item
                .get("values")
                .ok_or_else(|| ProviderError::invalid("gemini", "missing embedding values"))?;
            parse_vector("gemini", values)
        })
        .collect()
}

// ============ OpenAI ============

/// Embedding provider using an OpenAI-compatible `POST /v1/embeddings`.
pub struct OpenAIEmbedder {
    ctx: ProviderContext,
    model: String,
    batch_size: usize,
}

impl OpenAIEmbedder {
    pub fn new(ctx: ProviderContext, model: &str, batch_size: usize) -> Self {
        Self {
            ctx,
            model: model.to_string(),
            batch_size: batch_size.max(1),
        }
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ProviderError> {
        let body = json!({
            "model": self.model,
            "input": texts,
        });
        let url = format!("{}/v1/embeddings", self.ctx.base_url);

        let json = self.ctx.post_json(&url, &body).await?;
        parse_openai_response(&json)
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn embed(
        &self,
        texts: &[String],
        _mode: EmbedMode,
    ) -> Result<Vec<Vec<f32>>, ProviderError> {
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_batch(batch).await?);
        }
        check_count("openai", texts.len(), &out)?;
        Ok(out)
    }
}

/// Extract `data[].embedding`, ordered by each item's `index`.
fn parse_openai_response(json: &Value) -> Result<Vec<Vec<f32>>, ProviderError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| ProviderError::invalid("openai", "missing data array"))?;

    let mut indexed = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let index = item
            .get("index")
            .and_then(|i| i.as_u64())
            .map(|i| i as usize)
            .unwrap_or(position);
        let embedding = item
            .get("embedding")
            .ok_or_else(|| ProviderError::invalid("openai", "missing embedding"))?;
        indexed.push((index, parse_vector("openai", embedding)?));
    }

    indexed.sort_by_key(|(index, _)| *index);
    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

/// Create the configured [`Embedder`].
pub fn create_embedder(config: &Config, credentials: &Credentials) -> Result<Box<dyn Embedder>> {
    let ctx = ProviderContext::new(config, credentials.api_key())?;
    let model = config.embedding.model(config.provider.kind);
    let batch_size = config.embedding.batch_size;

    Ok(match config.provider.kind {
        ProviderKind::Gemini => Box::new(GeminiEmbedder::new(ctx, model, batch_size)),
        ProviderKind::OpenAI => Box::new(OpenAIEmbedder::new(ctx, model, batch_size)),
    })
}

/// Encode a float vector as a BLOB (little-endian f32 bytes).
///
/// ```rust
/// use policybot::embedding::{vec_to_blob, blob_to_vec};
///
/// let v = vec![1.0f32, -2.5, 3.125];
/// let blob = vec_to_blob(&v);
/// assert_eq!(blob.len(), 12);
/// assert_eq!(blob_to_vec(&blob), v);
/// ```
pub fn vec_to_blob(vec: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vec.len() * 4);
    for &v in vec {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

/// Decode a BLOB written by [`vec_to_blob`].
pub fn blob_to_vec(blob: &[u8]) -> Vec<f32> {
    blob.chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Cosine similarity in `[-1.0, 1.0]`.
///
/// Returns `0.0` for empty vectors, vectors of different lengths, or a
/// zero-magnitude vector.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom < f32::EPSILON {
        return 0.0;
    }

    dot / denom
}
