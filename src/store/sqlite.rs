//! SQLite-backed [`Collection`].
//!
//! All collections share one database file under `storage.path`. Vectors are
//! stored as little-endian `f32` BLOBs and searched by brute-force cosine
//! similarity in Rust, which is plenty for a handful of policy documents.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use sqlx::{Row, SqlitePool};

use crate::config::Config;
use crate::db;
use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::migrate;
use crate::models::{QueryMatch, QueryResult, RecordMetadata, StoredRecord};

use super::{rank_matches, Collection};

pub struct SqliteCollection {
    pool: SqlitePool,
    name: String,
}

/// Per-file record counts, as reported by `policybot status`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSummary {
    pub source: String,
    pub records: i64,
    pub last_updated: i64,
}

impl SqliteCollection {
    /// Open the configured collection, creating the store and the
    /// collection if either is missing. Used by ingestion.
    pub async fn open_or_create(config: &Config) -> Result<Self> {
        let pool = db::connect(config).await?;
        migrate::run_migrations(&pool).await?;

        let name = config.storage.collection.clone();
        sqlx::query("INSERT OR IGNORE INTO collections (name, created_at) VALUES (?, ?)")
            .bind(&name)
            .bind(chrono::Utc::now().timestamp())
            .execute(&pool)
            .await?;

        Ok(Self { pool, name })
    }

    /// Open the configured collection, failing if it has never been
    /// created. Used at query start-up.
    pub async fn open_existing(config: &Config) -> Result<Self> {
        let pool = db::connect_existing(config).await?;
        let name = config.storage.collection.clone();

        let exists: bool = sqlx::query_scalar(
            "SELECT COUNT(*) > 0 FROM sqlite_master WHERE type='table' AND name='collections'",
        )
        .fetch_one(&pool)
        .await?;

        let found = if exists {
            sqlx::query_scalar::<_, String>("SELECT name FROM collections WHERE name = ?")
                .bind(&name)
                .fetch_optional(&pool)
                .await?
                .is_some()
        } else {
            false
        };

        if !found {
            pool.close().await;
            bail!(
                "Collection '{}' does not exist in {}. Please run `policybot ingest` first.",
                name,
                config.storage.path.display()
            );
        }

        Ok(Self { pool, name })
    }

    /// Record counts grouped by source file, sorted by file name.
    pub async fn source_summaries(&self) -> Result<Vec<SourceSummary>> {
        let rows = sqlx::query(
            r#"
            SELECT
                json_extract(metadata_json, '$.source') AS source,
                COUNT(*) AS records,
                MAX(updated_at) AS last_updated
            FROM records
            WHERE collection = ?
            GROUP BY source
            ORDER BY source
            "#,
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .iter()
            .map(|row| SourceSummary {
                source: row.get("source"),
                records: row.get("records"),
                last_updated: row.get("last_updated"),
            })
            .collect())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[async_trait]
impl Collection for SqliteCollection {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upsert(&self, records: &[StoredRecord]) -> Result<()> {
        let now = chrono::Utc::now().timestamp();
        let mut tx = self.pool.begin().await?;

        for record in records {
            let metadata_json = serde_json::to_string(&record.metadata)?;
            sqlx::query(
                r#"
                INSERT INTO records (collection, id, embedding, dims, document, metadata_json, hash, updated_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(collection, id) DO UPDATE SET
                    embedding = excluded.embedding,
                    dims = excluded.dims,
                    document = excluded.document,
                    metadata_json = excluded.metadata_json,
                    hash = excluded.hash,
                    updated_at = excluded.updated_at
                "#,
            )
            .bind(&self.name)
            .bind(&record.id)
            .bind(vec_to_blob(&record.embedding))
            .bind(record.embedding.len() as i64)
            .bind(&record.document)
            .bind(&metadata_json)
            .bind(content_hash(&record.document))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn query(&self, embedding: &[f32], k: usize) -> Result<QueryResult> {
        if k == 0 {
            return Ok(QueryResult::default());
        }

        let rows = sqlx::query(
            "SELECT id, embedding, document, metadata_json FROM records WHERE collection = ?",
        )
        .bind(&self.name)
        .fetch_all(&self.pool)
        .await?;

        let mut matches = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String = row.get("id");
            let blob: Vec<u8> = row.get("embedding");
            let metadata_json: String = row.get("metadata_json");
            let metadata: RecordMetadata = serde_json::from_str(&metadata_json)
                .with_context(|| format!("corrupt metadata for record {}", id))?;

            matches.push(QueryMatch {
                score: cosine_similarity(embedding, &blob_to_vec(&blob)),
                document: row.get("document"),
                metadata,
                id,
            });
        }

        Ok(rank_matches(matches, k))
    }

    async fn count(&self) -> Result<usize> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM records WHERE collection = ?")
            .bind(&self.name)
            .fetch_one(&self.pool)
            .await?;
        Ok(count as usize)
    }
}
