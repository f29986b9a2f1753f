//! Periodic removal of old downloaded files.
//!
//! A background task sweeps the download directory once at startup and then
//! daily, deleting regular files older than a week. Catalog records are left
//! alone: history outlives the media on purpose, and the catalog file lives
//! outside the download directory.

use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, warn};

/// How often the download directory is swept.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Age past which a stored file is removed.
const MAX_FILE_AGE: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Starts the background sweep task. The first sweep runs immediately.
pub fn spawn(download_dir: PathBuf) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = tokio::time::interval(CLEANUP_INTERVAL);
        loop {
            ticks.tick().await;
            match sweep_old_files(&download_dir, MAX_FILE_AGE).await {
                Ok(0) => debug!("cleanup pass removed nothing"),
                Ok(removed) => info!(removed, "cleanup pass removed old files"),
                Err(err) => warn!(error = %err, "cleanup pass failed"),
            }
        }
    })
}

/// Removes regular files older than `max_age` from `dir`, returning how
/// many were deleted.
///
/// Subdirectories are skipped. Per-file failures are logged and do not stop
/// the sweep.
///
/// # Errors
///
/// Returns an error only when the directory itself cannot be read.
#[instrument(skip(dir), fields(dir = %dir.display()))]
pub async fn sweep_old_files(dir: &Path, max_age: Duration) -> io::Result<usize> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut removed = 0;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let metadata = match entry.metadata().await {
            Ok(metadata) => metadata,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "cannot stat entry");
                continue;
            }
        };
        if !metadata.is_file() {
            continue;
        }

        // Files with unreadable or future timestamps count as age zero.
        let age = metadata
            .modified()
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .unwrap_or(Duration::ZERO);
        if age <= max_age {
            continue;
        }

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(path = %path.display(), "removed old file");
                removed += 1;
            }
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to remove old file");
            }
        }
    }

    Ok(removed)
}
