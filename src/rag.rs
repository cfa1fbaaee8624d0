//! Query pipeline: embed the question, retrieve top-k chunks, generate a
//! grounded answer, cite sources.
//!
//! [`RagPipeline::answer`] returns a typed [`RagError`] for every failure
//! stage. [`RagPipeline::respond`] is the chat-facing turn function: it
//! never fails, rendering errors as the fixed apology messages instead.
//!
//! ```text
//! question ─▶ embed (query mode) ─▶ collection.query(k) ─▶ build_prompt
//!                                                            │
//!                       answer + **Sources:** ◀─ generate ◀──┘
//! ```

use std::sync::Arc;

use thiserror::Error;

use crate::citation;
use crate::config::{Config, Credentials};
use crate::embedding::{create_embedder, embed_query, Embedder};
use crate::error::ProviderError;
use crate::generation::{create_generator, Generator};
use crate::models::ChatTurn;
use crate::prompt::build_prompt;
use crate::store::{Collection, SqliteCollection};

pub const MSG_EMBED_FAILED: &str =
    "Sorry, I had trouble understanding your question. Please try again.";
pub const MSG_RETRIEVAL_FAILED: &str =
    "Sorry, I had trouble retrieving policy information. Please try again.";
pub const MSG_NO_CONTEXT: &str =
    "Sorry, I couldn't find any relevant information in the company policies.";
pub const MSG_GENERATION_FAILED: &str =
    "Sorry, I encountered an error while generating a response.";

#[derive(Debug, Error)]
pub enum RagError {
    #[error("failed to embed query")]
    EmbedQuery(#[source] ProviderError),

    #[error("failed to query collection")]
    Retrieval(#[source] anyhow::Error),

    #[error("no relevant context found")]
    NoRelevantContext,

    #[error("failed to generate answer")]
    Generation(#[source] ProviderError),
}

impl RagError {
    /// The message shown to the chat user for this failure.
    pub fn user_message(&self) -> &'static str {
        match self {
            RagError::EmbedQuery(_) => MSG_EMBED_FAILED,
            RagError::Retrieval(_) => MSG_RETRIEVAL_FAILED,
            RagError::NoRelevantContext => MSG_NO_CONTEXT,
            RagError::Generation(_) => MSG_GENERATION_FAILED,
        }
    }

    /// Whether a provider call was refused with HTTP 429.
    pub fn is_rate_limited(&self) -> bool {
        match self {
            RagError::EmbedQuery(e) | RagError::Generation(e) => e.is_rate_limited(),
            _ => false,
        }
    }
}

/// A generated answer and the files its context came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub text: String,
    /// Distinct, sorted filenames of the retrieved chunks.
    pub sources: Vec<String>,
}

impl Answer {
    /// The answer with its `**Sources:**` line appended.
    pub fn render(&self) -> String {
        citation::append_sources(&self.text, &self.sources)
    }
}

/// The query-side dependencies, constructed once and shared across turns.
#[derive(Clone)]
pub struct RagPipeline {
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    collection: Arc<dyn Collection>,
    top_k: usize,
}

impl RagPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        collection: Arc<dyn Collection>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            generator,
            collection,
            top_k,
        }
    }

    /// Wire the configured providers to the persisted collection.
    ///
    /// Fails if the collection has not been created by an ingestion run.
    pub async fn open(config: &Config, credentials: &Credentials) -> anyhow::Result<Self> {
        let embedder = create_embedder(config, credentials)?;
        let generator = create_generator(config, credentials)?;
        let collection = SqliteCollection::open_existing(config).await?;

        tracing::info!(
            embedding_model = embedder.model_name(),
            generation_model = generator.model_name(),
            top_k = config.retrieval.top_k,
            "query pipeline ready"
        );

        Ok(Self::new(
            Arc::from(embedder),
            Arc::from(generator),
            Arc::new(collection),
            config.retrieval.top_k,
        ))
    }

    pub fn collection(&self) -> &Arc<dyn Collection> {
        &self.collection
    }

    /// Run one turn, returning a typed error on failure.
    pub async fn answer(&self, message: &str) -> Result<Answer, RagError> {
        let query_embedding = embed_query(self.embedder.as_ref(), message)
            .await
            .map_err(RagError::EmbedQuery)?;

        let results = self
            .collection
            .query(&query_embedding, self.top_k)
            .await
            .map_err(RagError::Retrieval)?;

        if results.is_empty() {
            return Err(RagError::NoRelevantContext);
        }

        tracing::debug!(
            matches = results.matches.len(),
            top_score = results.matches[0].score,
            "retrieved context"
        );

        let prompt = build_prompt(&results.documents(), message);
        let text = self
            .generator
            .generate(&prompt)
            .await
            .map_err(RagError::Generation)?;

        Ok(Answer {
            text,
            sources: citation::unique_sources(&results.sources()),
        })
    }

    /// The chat turn function: `(message, history) -> answer string`.
    ///
    /// `history` is the transcript held by the chat UI. It is accepted for
    /// interface parity and not consulted; every turn stands alone.
    pub async fn respond(&self, message: &str, _history: &[ChatTurn]) -> String {
        match self.answer(message).await {
            Ok(answer) => answer.render(),
            Err(RagError::NoRelevantContext) => {
                tracing::info!("no relevant context for question");
                MSG_NO_CONTEXT.to_string()
            }
            Err(e) if e.is_rate_limited() => {
                tracing::warn!(error = %error_chain(&e), "provider rate limited chat turn");
                e.user_message().to_string()
            }
            Err(e) => {
                tracing::error!(error = %error_chain(&e), "chat turn failed");
                e.user_message().to_string()
            }
        }
    }
}

/// `outer: inner: root` rendering of an error and its sources.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbedMode;
    use crate::models::{RecordMetadata, StoredRecord};
    use crate::store::InMemoryCollection;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct FixedEmbedder {
        vector: Vec<f32>,
        fail: bool,
        status: u16,
    }

    impl FixedEmbedder {
        fn returning(vector: Vec<f32>) -> Self {
            Self { vector, fail: false, status: 500 }
        }

        fn failing(status: u16) -> Self {
            Self { vector: vec![], fail: true, status }
        }
    }

    #[async_trait]
    impl Embedder for FixedEmbedder {
        fn model_name(&self) -> &str {
            "fixed"
        }

        async fn embed(
            &self,
            texts: &[String],
            _mode: EmbedMode,
        ) -> Result<Vec<Vec<f32>>, ProviderError> {
            if self.fail {
                return Err(ProviderError::Api {
                    provider: "gemini",
                    status: self.status,
                    body: "boom".to_string(),
                });
            }
            Ok(texts.iter().map(|_| self.vector.clone()).collect())
        }
    }

    #[derive(Default)]
    struct RecordingGenerator {
        calls: AtomicUsize,
        last_prompt: Mutex<String>,
        fail: bool,
    }

    #[async_trait]
    impl Generator for RecordingGenerator {
        fn model_name(&self) -> &str {
            "recording"
        }

        async fn generate(&self, prompt: &str) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_prompt.lock().unwrap() = prompt.to_string();
            if self.fail {
                return Err(ProviderError::invalid("gemini", "no candidates returned"));
            }
            Ok("Employees get 20 days.".to_string())
        }
    }

    fn record(id: &str, embedding: Vec<f32>, source: &str, text: &str) -> StoredRecord {
        StoredRecord {
            id: id.to_string(),
            embedding,
            document: text.to_string(),
            metadata: RecordMetadata {
                source: source.to_string(),
            },
        }
    }

    async fn seeded_collection() -> Arc<InMemoryCollection> {
        let collection = Arc::new(InMemoryCollection::new("policies"));
        collection
            .upsert(&[
                record("hr.txt-chunk-0", vec![1.0, 0.0], "hr.txt", "Leave is 20 days."),
                record("hr.txt-chunk-1", vec![0.9, 0.1], "hr.txt", "Sick leave is 10 days."),
                record("it.txt-chunk-0", vec![0.0, 1.0], "it.txt", "Passwords rotate."),
            ])
            .await
            .unwrap();
        collection
    }

    fn pipeline(
        embedder: FixedEmbedder,
        generator: Arc<RecordingGenerator>,
        collection: Arc<InMemoryCollection>,
        top_k: usize,
    ) -> RagPipeline {
        RagPipeline::new(Arc::new(embedder), generator, collection, top_k)
    }

    #[tokio::test]
    async fn test_answer_cites_deduplicated_sources() {
        let generator = Arc::new(RecordingGenerator::default());
        let rag = pipeline(
            FixedEmbedder::returning(vec![1.0, 0.0]),
            generator.clone(),
            seeded_collection().await,
            2,
        );

        let answer = rag.answer("How much leave?").await.unwrap();
        assert_eq!(answer.sources, vec!["hr.txt"]);
        assert_eq!(
            answer.render(),
            "Employees get 20 days.\n\n**Sources:** hr.txt"
        );

        let prompt = generator.last_prompt.lock().unwrap().clone();
        assert!(prompt.contains("Leave is 20 days.\n---\nSick leave is 10 days."));
        assert!(!prompt.contains("Passwords rotate."));
    }

    #[tokio::test]
    async fn test_empty_collection_skips_generator() {
        let generator = Arc::new(RecordingGenerator::default());
        let rag = pipeline(
            FixedEmbedder::returning(vec![1.0, 0.0]),
            generator.clone(),
            Arc::new(InMemoryCollection::new("empty")),
            3,
        );

        assert!(matches!(
            rag.answer("anything").await,
            Err(RagError::NoRelevantContext)
        ));
        assert_eq!(rag.respond("anything", &[]).await, MSG_NO_CONTEXT);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_embed_failure_message() {
        let generator = Arc::new(RecordingGenerator::default());
        let rag = pipeline(
            FixedEmbedder::failing(500),
            generator.clone(),
            seeded_collection().await,
            3,
        );

        assert_eq!(rag.respond("q", &[]).await, MSG_EMBED_FAILED);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_rate_limited_embed_is_flagged() {
        let generator = Arc::new(RecordingGenerator::default());
        let rag = pipeline(
            FixedEmbedder::failing(429),
            generator.clone(),
            seeded_collection().await,
            3,
        );

        let err = rag.answer("q").await.unwrap_err();
        assert!(matches!(err, RagError::EmbedQuery(_)));
        assert!(err.is_rate_limited());
        assert_eq!(rag.respond("q", &[]).await, MSG_EMBED_FAILED);
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_generation_failure_message() {
        let generator = Arc::new(RecordingGenerator {
            fail: true,
            ..Default::default()
        });
        let rag = pipeline(
            FixedEmbedder::returning(vec![0.0, 1.0]),
            generator,
            seeded_collection().await,
            3,
        );

        assert!(!rag.answer("q").await.unwrap_err().is_rate_limited());
        assert_eq!(rag.respond("q", &[]).await, MSG_GENERATION_FAILED);
    }

    #[tokio::test]
    async fn test_history_is_ignored() {
        let generator = Arc::new(RecordingGenerator::default());
        let rag = pipeline(
            FixedEmbedder::returning(vec![0.0, 1.0]),
            generator,
            seeded_collection().await,
            1,
        );

        let history = vec![ChatTurn {
            user: "earlier".to_string(),
            assistant: "reply".to_string(),
        }];
        assert_eq!(
            rag.respond("q", &history).await,
            rag.respond("q", &[]).await
        );
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(RagError::NoRelevantContext.user_message(), MSG_NO_CONTEXT);
        let err = RagError::Retrieval(anyhow::anyhow!("disk"));
        assert_eq!(err.user_message(), MSG_RETRIEVAL_FAILED);
        assert_eq!(error_chain(&err), "failed to query collection: disk");
        assert!(!err.is_rate_limited());
    }
}
