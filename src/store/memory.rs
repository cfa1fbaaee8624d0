//! In-memory [`Collection`] for tests and embedding into other programs.
//!
//! Records live in a `HashMap` behind a `RwLock`; search is brute-force
//! cosine similarity, identical to the SQLite backend.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use crate::embedding::cosine_similarity;
use crate::models::{QueryMatch, QueryResult, StoredRecord};

use super::{rank_matches, Collection};

pub struct InMemoryCollection {
    name: String,
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl InMemoryCollection {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Collection for InMemoryCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[StoredRecord]) -> Result<()> {
        let mut stored = self.records.write().unwrap_or_else(|e| e.into_inner());
        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<QueryResult> {
        let stored = self.records.read().unwrap_or_else(|e| e.into_inner());
        let matches = stored
            .values()
            .map(|r| QueryMatch {
                id: r.id.clone(),
                document: r.document.clone(),
                metadata: r.metadata.clone(),
                score: cosine_similarity(embedding, &r.embedding),
            })
            .collect();
        Ok(rank_matches(matches, k))
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.records.read().unwrap_or_else(|e| e.into_inner()).len())
    }
}
