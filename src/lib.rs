//! # Policy Chatbot
//!
//! A retrieval-augmented chatbot that answers employee questions about
//! company policies, grounded in a handful of plain-text policy files.
//!
//! Two pipelines share one persistent vector store:
//!
//! ```text
//! ┌──────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Policy files │──▶│ Chunk+Embed │──▶│ SQLite store │
//! └──────────────┘   └─────────────┘   └──────┬───────┘
//!                                             │ top-k
//!      ┌──────────┐   ┌──────────────┐   ┌────▼─────┐
//!      │ Chat UI  │◀─▶│ RagPipeline  │──▶│ Generate │
//!      │ (/ HTTP) │   │ embed query  │   │ + cite   │
//!      └──────────┘   └──────────────┘   └──────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and credential loading |
//! | [`logging`] | `tracing` subscriber set-up |
//! | [`error`] | Provider error type |
//! | [`models`] | Core data types |
//! | [`chunk`] | Policy file loading and paragraph chunking |
//! | [`provider`] | Shared HTTP plumbing for Gemini and OpenAI |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`generation`] | Answer generation provider abstraction |
//! | [`store`] | Vector store collections |
//! | [`db`] | SQLite connection |
//! | [`migrate`] | Store schema |
//! | [`prompt`] | Grounded prompt construction |
//! | [`citation`] | Sources line formatting |
//! | [`rag`] | Query pipeline and chat turn function |
//! | [`ingest`] | Ingestion pipeline |
//! | [`server`] | Chat HTTP server |
//! | [`status`] | Store overview command |

pub mod chunk;
pub mod citation;
pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod ingest;
pub mod logging;
pub mod migrate;
pub mod models;
pub mod prompt;
pub mod provider;
pub mod rag;
pub mod server;
pub mod status;
pub mod store;
