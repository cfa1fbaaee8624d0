//! Vector store abstraction.
//!
//! The [`Collection`] trait is the only view the pipelines have of stored
//! records: upsert on the ingestion side, top-k similarity search on the
//! query side. How records are laid out on disk is private to each backend.
//!
//! | Backend | Use |
//! |---------|-----|
//! | [`SqliteCollection`] | Persistent collection under `storage.path` |
//! | [`InMemoryCollection`] | Tests and embedding in other programs |
//!
//! Both backends rank by cosine similarity, most similar first, breaking
//! ties by id so results are deterministic.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::cmp::Ordering;

use crate::models::{QueryMatch, QueryResult, StoredRecord};

pub use memory::InMemoryCollection;
pub use sqlite::{SourceSummary, SqliteCollection};

/// A named set of stored records.
#[async_trait]
pub trait Collection: Send + Sync {
    fn name(&self) -> &str;

    /// Insert records, overwriting any existing record with the same id.
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()>;

    /// Return up to `k` records nearest to `embedding`.
    async fn query(&self, embedding: &[f32], k: usize) -> Result<QueryResult>;

    /// Number of records in the collection.
    async fn count(&self) -> Result<usize>;
}

/// Sort by score descending then id ascending, and keep the first `k`.
pub(crate) fn rank_matches(mut matches: Vec<QueryMatch>, k: usize) -> QueryResult {
    matches.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.id.cmp(&b.id))
    });
    matches.truncate(k);
    QueryResult { matches }
}
