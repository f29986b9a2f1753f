//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;

/// Serve a video download web service.
///
/// Tubedown exposes a format preview endpoint, a WebSocket download channel
/// with live progress, and a catalog of completed downloads. Media handling
/// is delegated to an external extractor binary.
#[derive(Parser, Debug)]
#[command(name = "tubedown")]
#[command(author, version, about)]
pub struct Args {
    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,

    /// Pin the listening port instead of scanning 8000-8019
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory completed downloads are written to
    #[arg(short, long)]
    pub download_dir: Option<PathBuf>,

    /// Maximum concurrent downloads (1-100)
    #[arg(short = 'c', long, value_parser = clap::value_parser!(u8).range(1..=100))]
    pub concurrency: Option<u8>,
}
