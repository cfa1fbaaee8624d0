//! Core data models shared by the ingestion and query pipelines.

use serde::{Deserialize, Serialize};

/// A paragraph of a policy file, the unit of retrieval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentChunk {
    /// `<filename>-chunk-<index>`.
    pub id: String,
    pub text: String,
    /// Filename the chunk was read from, as configured.
    pub source: String,
}

/// Metadata persisted alongside every stored record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMetadata {
    pub source: String,
}

/// Output of the loader: index-aligned documents, metadata and ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkBatch {
    pub documents: Vec<String>,
    pub metadatas: Vec<RecordMetadata>,
    pub ids: Vec<String>,
}

impl ChunkBatch {
    pub fn push(&mut self, chunk: DocumentChunk) {
        self.ids.push(chunk.id);
        self.documents.push(chunk.text);
        self.metadatas.push(RecordMetadata {
            source: chunk.source,
        });
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Zip the batch with its embeddings into storable records.
    ///
    /// Returns `None` when the embedding count does not match the batch.
    pub fn into_records(self, embeddings: Vec<Vec<f32>>) -> Option<Vec<StoredRecord>> {
        if embeddings.len() != self.documents.len() {
            return None;
        }
        Some(
            self.ids
                .into_iter()
                .zip(embeddings)
                .zip(self.documents)
                .zip(self.metadatas)
                .map(|(((id, embedding), document), metadata)| StoredRecord {
                    id,
                    embedding,
                    document,
                    metadata,
                })
                .collect(),
        )
    }
}

/// The unit persisted in a collection, keyed by `id`.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub id: String,
    pub embedding: Vec<f32>,
    pub document: String,
    pub metadata: RecordMetadata,
}

/// One retrieved record.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryMatch {
    pub id: String,
    pub document: String,
    pub metadata: RecordMetadata,
    /// Cosine similarity to the query embedding.
    pub score: f32,
}

/// Retrieved records, most similar first.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    pub matches: Vec<QueryMatch>,
}

impl QueryResult {
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn documents(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.document.as_str()).collect()
    }

    pub fn sources(&self) -> Vec<&str> {
        self.matches
            .iter()
            .map(|m| m.metadata.source.as_str())
            .collect()
    }
}

/// A past exchange as held by the chat UI. The pipeline never reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub user: String,
    pub assistant: String,
}
