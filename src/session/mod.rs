//! One download request, driven from first event to completion or failure.
//!
//! # Overview
//!
//! A session moves through fixed stages: announce the metadata fetch, check
//! declared sizes against the limit, take a slot from the download gate,
//! stream the media while forwarding progress, verify the stored file's real
//! size, then record and announce the result. Size checks happen twice on
//! purpose: declared sizes are advisory and can be absent or wrong, so the
//! file on disk is measured again after the transfer and deleted when it
//! turns out oversized.
//!
//! Failures at any stage surface as a single `error` event carrying the
//! reason; nothing is recorded in the catalog for a failed download.

mod event;

use std::io;
use std::path::Path;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{info, instrument, warn};

use crate::catalog::{Catalog, DownloadRecord};
use crate::extractor::{ExtractorError, VideoExtractor};
use crate::limit::{DownloadGate, GateError};

pub use event::{EventSender, ProgressEvent};

/// Format selector that leaves the choice to the extractor.
pub const BEST_FORMAT: &str = "best";

/// Queue depth for progress samples between extractor and session.
const PROGRESS_BUFFER: usize = 64;

/// Timestamp format for catalog records.
const RECORD_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Errors that end a download session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The extractor failed to fetch metadata or media.
    #[error(transparent)]
    Extraction(#[from] ExtractorError),

    /// The download gate is unavailable.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// The declared video size exceeds the limit.
    #[error("video file is too large ({size_mb:.2} MB), the limit is {limit_mb} MB")]
    DeclaredTooLarge {
        /// Declared size in megabytes.
        size_mb: f64,
        /// Limit in whole megabytes.
        limit_mb: u64,
    },

    /// The selected format's declared size exceeds the limit.
    #[error("selected format is too large ({size_mb:.2} MB), the limit is {limit_mb} MB")]
    FormatTooLarge {
        /// Declared size in megabytes.
        size_mb: f64,
        /// Limit in whole megabytes.
        limit_mb: u64,
    },

    /// The stored file turned out larger than the limit.
    #[error("downloaded file is too large ({size_mb:.2} MB), the limit is {limit_mb} MB")]
    DownloadedTooLarge {
        /// Measured size in megabytes.
        size_mb: f64,
        /// Limit in whole megabytes.
        limit_mb: u64,
    },

    /// The stored file could not be measured.
    #[error("failed to verify downloaded file '{path}': {source}")]
    Verify {
        /// Path of the file that could not be measured.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

#[allow(clippy::cast_precision_loss)]
fn size_mb(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn whole_mb(bytes: u64) -> u64 {
    (bytes as f64 / 1024.0 / 1024.0).round() as u64
}

impl SessionError {
    fn declared_too_large(size: u64, limit: u64) -> Self {
        Self::DeclaredTooLarge {
            size_mb: size_mb(size),
            limit_mb: whole_mb(limit),
        }
    }

    fn format_too_large(size: u64, limit: u64) -> Self {
        Self::FormatTooLarge {
            size_mb: size_mb(size),
            limit_mb: whole_mb(limit),
        }
    }

    fn downloaded_too_large(size: u64, limit: u64) -> Self {
        Self::DownloadedTooLarge {
            size_mb: size_mb(size),
            limit_mb: whole_mb(limit),
        }
    }

    fn verify(path: &Path, source: io::Error) -> Self {
        Self::Verify {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Drives one download request end to end.
pub struct DownloadSession {
    extractor: Arc<dyn VideoExtractor>,
    catalog: Arc<Catalog>,
    gate: Arc<DownloadGate>,
    max_file_size: u64,
}

impl DownloadSession {
    /// Creates a session sharing the server's extractor, catalog, and gate.
    #[must_use]
    pub fn new(
        extractor: Arc<dyn VideoExtractor>,
        catalog: Arc<Catalog>,
        gate: Arc<DownloadGate>,
        max_file_size: u64,
    ) -> Self {
        Self {
            extractor,
            catalog,
            gate,
            max_file_size,
        }
    }

    /// Runs the session, ending with exactly one `complete` or `error` event.
    #[instrument(skip(self, events))]
    pub async fn run(&self, url: &str, format_id: &str, events: &EventSender) {
        match self.drive(url, format_id, events).await {
            Ok(record) => {
                info!(title = %record.title, filesize = record.filesize, "download complete");
                events.send(ProgressEvent::complete(record)).await;
            }
            Err(err) => {
                warn!(error = %err, "download session failed");
                events.send(ProgressEvent::error(err.to_string())).await;
            }
        }
    }

    async fn drive(
        &self,
        url: &str,
        format_id: &str,
        events: &EventSender,
    ) -> Result<DownloadRecord, SessionError> {
        events
            .send(ProgressEvent::info("Fetching video information..."))
            .await;

        let metadata = self.extractor.fetch_metadata(url).await?;

        if let Some(declared) = metadata.declared_size() {
            if declared > self.max_file_size {
                return Err(SessionError::declared_too_large(declared, self.max_file_size));
            }
        }

        // A specific format can be smaller than the default selection, so
        // its own declared size gets the final say.
        if format_id != BEST_FORMAT {
            if let Some(size) = metadata.format(format_id).and_then(|f| f.known_size()) {
                if size > self.max_file_size {
                    return Err(SessionError::format_too_large(size, self.max_file_size));
                }
            }
        }

        let permit = self.gate.acquire().await?;

        let (tx, mut rx) = mpsc::channel(PROGRESS_BUFFER);
        let transfer = self.extractor.download(url, format_id, tx);
        let forward = async {
            while let Some(sample) = rx.recv().await {
                events.send(ProgressEvent::from(sample)).await;
            }
        };
        let (outcome, ()) = tokio::join!(transfer, forward);
        drop(permit);
        let downloaded = outcome?;

        let actual_size = tokio::fs::metadata(&downloaded.path)
            .await
            .map_err(|err| SessionError::verify(&downloaded.path, err))?
            .len();

        if actual_size > self.max_file_size {
            if let Err(err) = tokio::fs::remove_file(&downloaded.path).await {
                warn!(
                    path = %downloaded.path.display(),
                    error = %err,
                    "failed to remove oversized file"
                );
            }
            return Err(SessionError::downloaded_too_large(actual_size, self.max_file_size));
        }

        let filename = downloaded
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let record = DownloadRecord {
            title: metadata.title.unwrap_or_else(|| "Unknown Title".to_string()),
            duration: metadata.duration.unwrap_or(0.0),
            uploader: metadata
                .uploader
                .unwrap_or_else(|| "Unknown Uploader".to_string()),
            description: metadata.description.unwrap_or_default(),
            filename,
            download_date: Local::now().format(RECORD_DATE_FORMAT).to_string(),
            filesize: actual_size,
        };

        // A catalog write failure loses the history entry, not the download.
        if let Err(err) = self.catalog.append(record.clone()).await {
            warn!(error = %err, "failed to record download in catalog");
        }

        Ok(record)
    }
}
