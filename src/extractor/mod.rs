//! Video metadata and media extraction.
//!
//! # Overview
//!
//! The server never talks to video sites directly. Everything it knows about
//! a URL comes from an extractor: one call for metadata (title, uploader,
//! available formats with declared sizes), one call to stream the media to
//! disk while reporting progress.
//!
//! The seam is the [`VideoExtractor`] trait. Production uses
//! [`YtDlpExtractor`], which shells out to the `yt-dlp` binary; tests swap in
//! scripted extractors to exercise sessions without touching the network.

mod error;
mod metadata;
mod progress;
mod ytdlp;

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::sync::mpsc;

pub use error::ExtractorError;
pub use metadata::{FormatMetadata, VideoMetadata};
pub use progress::ProgressSample;
pub use ytdlp::YtDlpExtractor;

/// Outcome of a completed media download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedFile {
    /// Path of the stored media file inside the download directory.
    pub path: PathBuf,
}

/// Source of video metadata and media.
///
/// Implementations must be safe to share across connections; the server
/// holds one instance behind an `Arc` for its whole lifetime.
#[async_trait]
pub trait VideoExtractor: Send + Sync {
    /// Fetches metadata for `url` without downloading any media.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractorError`] if the extractor cannot be run, the
    /// site rejects the URL, or the returned metadata cannot be parsed.
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ExtractorError>;

    /// Downloads the media for `url` in the requested format.
    ///
    /// Progress is reported through `progress` as the transfer advances;
    /// the channel closing early must not abort the download.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractorError`] if the transfer fails or the stored
    /// file cannot be located afterwards.
    async fn download(
        &self,
        url: &str,
        format_id: &str,
        progress: mpsc::Sender<ProgressSample>,
    ) -> Result<DownloadedFile, ExtractorError>;
}
