//! Confluence CLI - a terminal front end for the Confluence 2.0 client.
//!
//! Sign-in goes through the browser: `confluence login` prints the OAuth
//! URL, and `confluence callback <url>` completes it from the redirect.

mod commands;
mod terminal;

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use confluence_core::{AppContext, Config};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use terminal::{HintNavigator, StderrNotifier};

/// Directory for an optional daily log file.
const LOG_DIR_ENV: &str = "CONFLUENCE_LOG_DIR";

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV).map(PathBuf::from) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "confluence.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (
                Some(fmt::layer().with_ansi(false).with_writer(writer)),
                Some(guard),
            )
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.is_empty() || args[0] == "--help" || args[0] == "-h" {
        println!("{}", commands::USAGE);
        return Ok(());
    }

    let config = Config::load()?;
    let ctx = AppContext::start(config, Arc::new(StderrNotifier), Arc::new(HintNavigator))?;
    info!("Confluence CLI starting");

    let result = commands::run(&ctx, &args).await;

    ctx.shutdown();
    result
}
