//! Persistent catalog of completed downloads.
//!
//! # Overview
//!
//! The catalog is a single JSON file holding a flat array of
//! [`DownloadRecord`] entries, one per completed download, oldest first.
//! Reads are tolerant: a missing, unreadable, or corrupt file degrades to an
//! empty catalog with a log entry rather than an error, so a damaged file
//! never takes the service down. Writes rewrite the whole file; `append`
//! serializes writers behind a mutex so concurrent completions cannot lose
//! records to a read-modify-write race.

use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, error, instrument, warn};

/// Error type for catalog persistence.
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    /// Failed to serialize the record list.
    #[error("failed to serialize catalog: {source}")]
    Serialize {
        /// The underlying serialization error.
        #[source]
        source: serde_json::Error,
    },

    /// Failed to write the catalog file.
    #[error("failed to write catalog file '{path}': {source}")]
    Write {
        /// Path of the catalog file.
        path: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl CatalogError {
    /// Creates a serialization error.
    #[must_use]
    pub fn serialize(source: serde_json::Error) -> Self {
        Self::Serialize { source }
    }

    /// Creates a write error for the given path.
    pub fn write(path: impl Into<String>, source: io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }
}

/// One completed download, as stored in the catalog file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadRecord {
    /// Video title.
    pub title: String,
    /// Duration in seconds.
    pub duration: f64,
    /// Uploader or channel name.
    pub uploader: String,
    /// Video description.
    pub description: String,
    /// File name of the stored media, relative to the download directory.
    pub filename: String,
    /// Local completion time, formatted `%Y-%m-%d %H:%M:%S`.
    pub download_date: String,
    /// Size of the stored file in bytes.
    pub filesize: u64,
}

/// JSON-file backed store of download records.
#[derive(Debug)]
pub struct Catalog {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Catalog {
    /// Creates a catalog backed by the file at `path`.
    ///
    /// The file is not touched until the first read or write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads all records, degrading to an empty list on any failure.
    ///
    /// A missing file is the normal first-run state and logs at debug;
    /// unreadable or corrupt files log at warn/error and also yield an
    /// empty list.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> Vec<DownloadRecord> {
        let raw = match tokio::fs::read(&self.path).await {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("catalog file not found, starting empty");
                return Vec::new();
            }
            Err(err) => {
                warn!(error = %err, "failed to read catalog file, treating as empty");
                return Vec::new();
            }
        };

        match serde_json::from_slice(&raw) {
            Ok(records) => records,
            Err(err) => {
                error!(error = %err, "catalog file is corrupt, treating as empty");
                Vec::new()
            }
        }
    }

    /// Writes `records` to the catalog file, replacing previous contents.
    ///
    /// The file is pretty-printed with two-space indentation.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::Serialize`] if the records cannot be encoded,
    /// or [`CatalogError::Write`] if the file cannot be written.
    #[instrument(skip(self, records), fields(path = %self.path.display(), count = records.len()))]
    pub async fn save(&self, records: &[DownloadRecord]) -> Result<(), CatalogError> {
        let json = serde_json::to_string_pretty(records).map_err(CatalogError::serialize)?;

        tokio::fs::write(&self.path, json)
            .await
            .map_err(|err| CatalogError::write(self.path.display().to_string(), err))?;

        debug!("catalog saved");
        Ok(())
    }

    /// Appends one record, rewriting the whole file.
    ///
    /// Writers are serialized behind a mutex so two concurrent appends
    /// cannot drop each other's record.
    ///
    /// # Errors
    ///
    /// Returns a [`CatalogError`] if the rewritten file cannot be saved.
    #[instrument(skip(self, record), fields(title = %record.title))]
    pub async fn append(&self, record: DownloadRecord) -> Result<(), CatalogError> {
        let _guard = self.write_lock.lock().await;

        let mut records = self.load().await;
        records.push(record);
        self.save(&records).await
    }
}
