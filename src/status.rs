//! Vector store overview.
//!
//! `policybot status` prints where the store lives, how large it is, and how
//! many chunks each policy file contributed. Handy for checking an ingestion
//! run before starting the chat server.

use anyhow::Result;

use crate::config::Config;
use crate::db;
use crate::store::{Collection, SqliteCollection};

/// Run the status command: open the existing collection and print a summary.
pub async fn run_status(config: &Config) -> Result<()> {
    let collection = SqliteCollection::open_existing(config).await?;

    let total = collection.count().await?;
    let summaries = collection.source_summaries().await?;
    let store_size = std::fs::metadata(db::store_file(config))
        .map(|m| m.len())
        .unwrap_or(0);

    println!("Policy Chatbot Vector Store");
    println!("===========================");
    println!();
    println!("  Store:       {}", config.storage.path.display());
    println!("  Size:        {}", format_bytes(store_size));
    println!("  Collection:  {}", collection.name());
    println!("  Chunks:      {}", total);

    if !summaries.is_empty() {
        println!();
        println!("  By file:");
        println!("  {:<40} {:>8}   {}", "FILE", "CHUNKS", "UPDATED");
        println!("  {}", "-".repeat(64));
        for s in &summaries {
            println!(
                "  {:<40} {:>8}   {}",
                s.source,
                s.records,
                format_ts_relative(s.last_updated)
            );
        }
    }

    println!();

    collection.close().await;
    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{} B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

/// Format a Unix timestamp relative to now (e.g. "3 hours ago").
fn format_ts_relative(ts: i64) -> String {
    let delta = chrono::Utc::now().timestamp() - ts;

    if delta < 0 {
        format_ts_iso(ts)
    } else if delta < 60 {
        "just now".to_string()
    } else if delta < 3600 {
        plural(delta / 60, "min")
    } else if delta < 86400 {
        plural(delta / 3600, "hour")
    } else if delta < 86400 * 30 {
        plural(delta / 86400, "day")
    } else {
        format_ts_iso(ts)
    }
}

fn plural(n: i64, unit: &str) -> String {
    format!("{} {}{} ago", n, unit, if n == 1 { "" } else { "s" })
}

fn format_ts_iso(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(3 * 1024 * 1024), "3.0 MB");
    }

    #[test]
    fn test_format_ts_relative() {
        let now = chrono::Utc::now().timestamp();
        assert_eq!(format_ts_relative(now), "just now");
        assert_eq!(format_ts_relative(now - 120), "2 mins ago");
        assert_eq!(format_ts_relative(now - 3600), "1 hour ago");
        assert_eq!(format_ts_relative(now - 3 * 86400), "3 days ago");
        assert_eq!(format_ts_relative(0), "1970-01-01 00:00");
    }
}
