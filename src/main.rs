//! Page-Mirror main entry point
//!
//! This is the command-line interface for the Page-Mirror single-page mirror.

use anyhow::Context;
use clap::Parser;
use page_mirror::config::{load_config, Config};
use page_mirror::mirror::run_mirror;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Page-Mirror: saves a web page and its images for offline viewing
///
/// The page is stored under `<storage-root>/<host>/` with every image it
/// references downloaded to an `img` sub-folder and the page rewritten to use
/// the local copies.
#[derive(Parser, Debug)]
#[command(name = "page-mirror")]
#[command(version)]
#[command(about = "Mirrors a single web page and its images", long_about = None)]
struct Cli {
    /// URL of the page to mirror (the http:// prefix may be omitted)
    #[arg(value_name = "URL")]
    url: Option<String>,

    /// Path to an optional TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Folder holding the mirrored sites (overrides the config file)
    #[arg(long, value_name = "DIR")]
    storage_root: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(url) = cli.url else {
        tracing::info!("usage: page-mirror [url]");
        return Ok(());
    };

    let mut config = match &cli.config {
        Some(path) => {
            tracing::debug!("Loading configuration from: {}", path.display());
            load_config(path)
                .with_context(|| format!("failed to load configuration from {}", path.display()))?
        }
        None => Config::default(),
    };

    if let Some(root) = cli.storage_root {
        config.storage.root = root;
    }

    let report = run_mirror(config, &url)
        .await
        .with_context(|| format!("could not mirror {}", url.trim()))?;

    tracing::info!(
        "{} of {} images saved locally to {}",
        report.images_saved,
        report.images_found,
        report.page_path.display()
    );

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("page_mirror=info,warn"),
            1 => EnvFilter::new("page_mirror=debug,info"),
            2 => EnvFilter::new("page_mirror=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}
