//! # Policy Chatbot CLI (`policybot`)
//!
//! ```bash
//! policybot --config ./config/policybot.toml <command>
//! ```
//!
//! | Command | Description |
//! |---------|-------------|
//! | `policybot ingest` | Chunk, embed and store the configured policy files |
//! | `policybot serve` | Start the chat server |
//! | `policybot ask "<question>"` | Answer one question in the terminal |
//! | `policybot status` | Show what the vector store holds |
//!
//! `ingest`, `serve` and `ask` need an API key in the environment
//! (`GOOGLE_API_KEY` by default).

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use policybot::config::{self, Credentials};
use policybot::ingest;
use policybot::logging;
use policybot::rag::RagPipeline;
use policybot::server;
use policybot::status;

/// Policy Chatbot: answers questions about company policies using
/// retrieval-augmented generation over a local vector store.
#[derive(Parser)]
#[command(name = "policybot", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/policybot.toml`. When the file is missing the
    /// built-in defaults are used.
    #[arg(long, global = true, default_value = "./config/policybot.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Chunk, embed and store the configured policy files.
    ///
    /// Rerunning overwrites chunks with the same id; chunks whose ids no
    /// longer occur are left in place.
    Ingest,

    /// Start the chat server.
    Serve,

    /// Answer a single question and exit.
    Ask {
        /// The question to ask.
        question: String,
    },

    /// Show the vector store location and per-file chunk counts.
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest => {
            let credentials = Credentials::from_env(&cfg)?;
            ingest::run_ingest_command(&cfg, &credentials).await?;
        }
        Commands::Serve => {
            let credentials = Credentials::from_env(&cfg)?;
            let pipeline = RagPipeline::open(&cfg, &credentials).await?;
            server::run_server(&cfg, pipeline).await?;
        }
        Commands::Ask { question } => {
            let credentials = Credentials::from_env(&cfg)?;
            let pipeline = RagPipeline::open(&cfg, &credentials).await?;
            println!("{}", pipeline.respond(&question, &[]).await);
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
    }

    Ok(())
}
