mod cli;
mod engine;
mod error;
mod logging;
mod metrics;
mod model;
mod orchestrator;
mod session;
mod storage;
mod table;
mod text_summary;
#[cfg(feature = "tui")]
mod tui;

use anyhow::Result;
use clap::Parser;

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();
    let is_non_tui = args.json || args.text || cfg!(not(feature = "tui"));

    let log_path = args
        .log_file
        .clone()
        .unwrap_or_else(storage::default_log_path);
    logging::init(&log_path);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting");

    match cli::run(args).await {
        Ok(()) => {
            // Explicitly exit with code 0 on success, especially for non-TUI modes
            if is_non_tui {
                std::process::exit(0);
            }
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "run failed");
            Err(e)
        }
    }
}
