//! Ingestion pipeline orchestration.
//!
//! Runs the one-shot flow: policy files → paragraph chunks → document-mode
//! embeddings → upsert into the configured collection. Each step completes
//! before the next starts. Per-file read errors skip the file; an embedding
//! failure stops the run before anything is written.

use anyhow::Result;

use crate::chunk::load_and_chunk;
use crate::config::{Config, Credentials};
use crate::embedding::{create_embedder, EmbedMode, Embedder};
use crate::store::{Collection, SqliteCollection};

/// Outcome of an ingestion run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestReport {
    /// Chunks produced by the loader.
    pub chunks_loaded: usize,
    /// Chunks written in this run.
    pub chunks_stored: usize,
    /// Records in the collection after the run.
    pub collection_count: usize,
}

/// Entry point for `policybot ingest`.
pub async fn run_ingest_command(config: &Config, credentials: &Credentials) -> Result<()> {
    let embedder = create_embedder(config, credentials)?;
    let collection = SqliteCollection::open_or_create(config).await?;

    let result = run_ingest(config, embedder.as_ref(), &collection).await;
    collection.close().await;
    result.map(|_| ())
}

/// Chunk, embed and store every configured policy file.
///
/// Only storage errors are returned as `Err`. A run with no readable files
/// or a failed embedding call reports progress and returns with nothing
/// stored.
pub async fn run_ingest(
    config: &Config,
    embedder: &dyn Embedder,
    collection: &dyn Collection,
) -> Result<IngestReport> {
    println!("Starting ingestion process...");

    let batch = load_and_chunk(&config.ingest.files);
    let chunks_loaded = batch.len();

    if batch.is_empty() {
        println!("No documents were loaded. Exiting.");
        return Ok(IngestReport {
            chunks_loaded: 0,
            chunks_stored: 0,
            collection_count: collection.count().await?,
        });
    }

    println!("Generating embeddings for {} documents...", chunks_loaded);
    tracing::info!(
        model = embedder.model_name(),
        chunks = chunks_loaded,
        "embedding documents"
    );

    let embeddings = match embedder.embed(&batch.documents, EmbedMode::Document).await {
        Ok(embeddings) => embeddings,
        Err(e) => {
            tracing::error!(error = %e, "embedding failed");
            println!("Failed to generate embeddings. Exiting.");
            return Ok(IngestReport {
                chunks_loaded,
                chunks_stored: 0,
                collection_count: collection.count().await?,
            });
        }
    };

    let Some(records) = batch.into_records(embeddings) else {
        tracing::error!("embedding count does not match chunk count");
        println!("Failed to generate embeddings. Exiting.");
        return Ok(IngestReport {
            chunks_loaded,
            chunks_stored: 0,
            collection_count: collection.count().await?,
        });
    };

    println!(
        "Storing {} chunks in collection '{}'...",
        records.len(),
        collection.name()
    );
    collection.upsert(&records).await?;

    let collection_count = collection.count().await?;
    println!("\n--- Ingestion Complete ---");
    println!("Total chunks added: {}", collection_count);
    println!(
        "Collection '{}' is ready at {}",
        collection.name(),
        config.storage.path.display()
    );

    Ok(IngestReport {
        chunks_loaded,
        chunks_stored: records.len(),
        collection_count,
    })
}
