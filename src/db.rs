use anyhow::{bail, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::config::Config;

/// File inside `storage.path` holding every collection.
pub const STORE_FILE: &str = "store.sqlite";

pub fn store_file(config: &Config) -> PathBuf {
    config.storage.path.join(STORE_FILE)
}

/// Open the store, creating the storage directory and database file if
/// they do not exist yet.
pub async fn connect(config: &Config) -> Result<SqlitePool> {
    std::fs::create_dir_all(&config.storage.path)?;
    open(&store_file(config), true).await
}

/// Open an existing store. Fails if nothing has been ingested yet.
pub async fn connect_existing(config: &Config) -> Result<SqlitePool> {
    let path = store_file(config);
    if !path.exists() {
        bail!(
            "No vector store found at {}. Please run `policybot ingest` first.",
            config.storage.path.display()
        );
    }
    open(&path, false).await
}

async fn open(path: &Path, create: bool) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(create)
        .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    Ok(pool)
}
