//! Paragraph-boundary loader and chunker.
//!
//! Policy files are split on blank lines (`\n\n`). Every non-blank segment
//! becomes one [`DocumentChunk`] with the deterministic id
//! `<filename>-chunk-<index>`, where `<index>` is the segment's position in
//! the raw split. Blank segments are dropped without renumbering, so ids can
//! skip ordinals but never collide.
//!
//! There is no size bound: a long paragraph becomes one long chunk.

use std::collections::HashSet;
use std::io::ErrorKind;

use crate::models::{ChunkBatch, DocumentChunk};

const PARAGRAPH_SEPARATOR: &str = "\n\n";

/// Split one file's text into chunks.
pub fn split_paragraphs(filename: &str, text: &str) -> Vec<DocumentChunk> {
    text.split(PARAGRAPH_SEPARATOR)
        .enumerate()
        .filter(|(_, segment)| !segment.trim().is_empty())
        .map(|(i, segment)| DocumentChunk {
            id: chunk_id(filename, i),
            text: segment.to_string(),
            source: filename.to_string(),
        })
        .collect()
}

/// The stable id of the `index`-th raw segment of `filename`.
pub fn chunk_id(filename: &str, index: usize) -> String {
    format!("{}-chunk-{}", filename, index)
}

/// Read and chunk every file in `files`.
///
/// Unreadable files are reported and skipped; they never abort the run.
/// A file listed more than once is loaded only the first time, so chunk ids
/// stay unique within the batch.
pub fn load_and_chunk(files: &[String]) -> ChunkBatch {
    let mut batch = ChunkBatch::default();
    let mut seen = HashSet::new();

    println!("Loading and chunking documents...");
    for filename in files {
        if !seen.insert(filename.as_str()) {
            tracing::warn!(file = %filename, "policy file listed twice");
            println!("Warning: File {} is listed more than once. Skipping.", filename);
            continue;
        }
        match std::fs::read_to_string(filename) {
            Ok(text) => {
                let chunks = split_paragraphs(filename, &text);
                tracing::debug!(file = %filename, chunks = chunks.len(), "chunked file");
                for chunk in chunks {
                    batch.push(chunk);
                }
                println!("Loaded and chunked {}", filename);
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                tracing::warn!(file = %filename, "policy file not found");
                println!("Warning: File {} not found. Skipping.", filename);
            }
            Err(e) => {
                tracing::warn!(file = %filename, error = %e, "failed to read policy file");
                println!("Error processing {}: {}", filename, e);
            }
        }
    }

    batch
}
