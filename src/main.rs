//! Server entry point for the tubedown service.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info};
use tubedown_core::cleanup;
use tubedown_core::config::Config;
use tubedown_core::extractor::YtDlpExtractor;
use tubedown_core::server::{self, AppState};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Determine log level based on verbose/quiet flags
    // Priority: RUST_LOG env var > quiet flag > verbose flag > default (info)
    let default_level = if args.quiet {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");
    info!("Tubedown starting");

    // Environment first, CLI flags on top
    let mut config = Config::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.port = Some(port);
    }
    if let Some(dir) = args.download_dir {
        config.download_dir = dir;
    }
    if let Some(concurrency) = args.concurrency {
        config.max_concurrent_downloads = usize::from(concurrency);
    }
    config.validate().context("invalid configuration")?;

    tokio::fs::create_dir_all(&config.download_dir)
        .await
        .with_context(|| {
            format!(
                "failed to create download directory '{}'",
                config.download_dir.display()
            )
        })?;

    // Daily sweep of old downloaded files; runs for the life of the process.
    cleanup::spawn(config.download_dir.clone());

    let listener = server::bind_available_port(&config).await?;
    let addr = listener.local_addr().context("listener has no address")?;

    let extractor = Arc::new(YtDlpExtractor::from_config(&config));
    let state = AppState::new(config, extractor)?;
    let router = server::build_router(state);

    info!("Serving on http://{addr}");
    axum::serve(
        listener,
        router.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    Ok(())
}
