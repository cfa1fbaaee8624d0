//! Diagnostic logging.
//!
//! Diagnostics go to stderr through `tracing`, filtered by `RUST_LOG`
//! (default `info`). Stdout is left to the CLI's progress output and answers.

use tracing_subscriber::EnvFilter;

pub fn init() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // A subscriber may already be installed when embedded in another program.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
