//! Metadata-only preview of a video and its downloadable formats.
//!
//! # Overview
//!
//! A preview answers "what would I get" without transferring any media: the
//! video's headline fields plus the formats a client may pick from. Formats
//! are offered only when the site declares an exact positive size, and only
//! when that size fits under the configured limit, so the picker never shows
//! a choice the download stage would reject outright.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, instrument};

use crate::extractor::{ExtractorError, FormatMetadata, VideoExtractor, VideoMetadata};

/// One selectable format in a preview.
#[derive(Debug, Clone, Serialize)]
pub struct FormatOption {
    /// Identifier to send back when requesting this format.
    pub format_id: String,
    /// Container extension.
    pub ext: String,
    /// Opaque quality ranking from the extractor, zero when absent.
    pub quality: f64,
    /// Declared size in bytes.
    pub filesize: u64,
    /// Declared size in megabytes, rounded to two decimals.
    pub filesize_mb: f64,
    /// Human-readable format description.
    pub format_note: String,
}

/// Preview of a single video.
#[derive(Debug, Clone, Serialize)]
pub struct VideoPreview {
    /// Video title.
    pub title: String,
    /// Duration in seconds.
    pub duration: f64,
    /// Uploader or channel name.
    pub uploader: String,
    /// Thumbnail image URL, empty when absent.
    pub thumbnail: String,
    /// Formats fitting under the size limit.
    pub formats: Vec<FormatOption>,
    /// Video description.
    pub description: String,
}

/// Builds previews from extractor metadata.
pub struct PreviewService {
    extractor: Arc<dyn VideoExtractor>,
    max_file_size: u64,
}

/// Converts a byte count to megabytes rounded to two decimals.
#[allow(clippy::cast_precision_loss)]
fn megabytes(bytes: u64) -> f64 {
    let mb = bytes as f64 / 1024.0 / 1024.0;
    (mb * 100.0).round() / 100.0
}

impl PreviewService {
    /// Creates a service offering only formats of at most `max_file_size` bytes.
    #[must_use]
    pub fn new(extractor: Arc<dyn VideoExtractor>, max_file_size: u64) -> Self {
        Self {
            extractor,
            max_file_size,
        }
    }

    /// Fetches metadata for `url` and shapes it into a preview.
    ///
    /// # Errors
    ///
    /// Returns an [`ExtractorError`] when metadata cannot be fetched or read.
    #[instrument(skip(self))]
    pub async fn preview(&self, url: &str) -> Result<VideoPreview, ExtractorError> {
        let metadata = self.extractor.fetch_metadata(url).await?;
        let preview = self.build_preview(metadata);
        debug!(formats = preview.formats.len(), "preview built");
        Ok(preview)
    }

    fn build_preview(&self, metadata: VideoMetadata) -> VideoPreview {
        let formats = metadata
            .formats
            .iter()
            .filter_map(|format| self.format_option(format))
            .collect();

        VideoPreview {
            title: metadata.title.unwrap_or_else(|| "Unknown Title".to_string()),
            duration: metadata.duration.unwrap_or(0.0),
            uploader: metadata
                .uploader
                .unwrap_or_else(|| "Unknown Uploader".to_string()),
            thumbnail: metadata.thumbnail.unwrap_or_default(),
            formats,
            description: metadata.description.unwrap_or_default(),
        }
    }

    /// Shapes one format, or drops it when its size is unknown or over the limit.
    #[allow(clippy::cast_precision_loss)]
    fn format_option(&self, format: &FormatMetadata) -> Option<FormatOption> {
        let filesize = format.known_size()?;
        let filesize_mb = megabytes(filesize);
        let limit_mb = self.max_file_size as f64 / 1024.0 / 1024.0;
        if filesize_mb > limit_mb {
            return None;
        }

        Some(FormatOption {
            format_id: format.format_id.clone().unwrap_or_default(),
            ext: format.ext.clone().unwrap_or_default(),
            quality: format.quality.unwrap_or(0.0),
            filesize,
            filesize_mb,
            format_note: format.format_note.clone().unwrap_or_default(),
        })
    }
}
