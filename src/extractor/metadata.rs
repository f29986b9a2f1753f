//! Typed view of the extractor's JSON metadata output.
//!
//! Every field is optional: the JSON shape varies by site and by video, and
//! a missing key must never fail the whole parse. Size fields are `f64`
//! because approximate sizes arrive as floats for some videos.

use serde::Deserialize;

/// Metadata for one downloadable format of a video.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormatMetadata {
    /// Identifier used to request this exact format.
    #[serde(default)]
    pub format_id: Option<String>,
    /// Container extension, e.g. `mp4`.
    #[serde(default)]
    pub ext: Option<String>,
    /// Opaque quality ranking assigned by the extractor.
    #[serde(default)]
    pub quality: Option<f64>,
    /// Exact size in bytes, when the site reports one.
    #[serde(default)]
    pub filesize: Option<f64>,
    /// Estimated size in bytes.
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    /// Human-readable format description, e.g. `1080p`.
    #[serde(default)]
    pub format_note: Option<String>,
}

impl FormatMetadata {
    /// Returns the exact declared size in bytes, when known and positive.
    ///
    /// Estimated sizes do not count; format-level decisions only trust
    /// exact figures.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn known_size(&self) -> Option<u64> {
        self.filesize.filter(|size| *size > 0.0).map(|size| size as u64)
    }
}

/// Metadata for a whole video.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VideoMetadata {
    /// Video title.
    #[serde(default)]
    pub title: Option<String>,
    /// Duration in seconds.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Uploader or channel name.
    #[serde(default)]
    pub uploader: Option<String>,
    /// Video description.
    #[serde(default)]
    pub description: Option<String>,
    /// Thumbnail image URL.
    #[serde(default)]
    pub thumbnail: Option<String>,
    /// Exact size in bytes for the default selection, when reported.
    #[serde(default)]
    pub filesize: Option<f64>,
    /// Estimated size in bytes for the default selection.
    #[serde(default)]
    pub filesize_approx: Option<f64>,
    /// Available formats.
    #[serde(default)]
    pub formats: Vec<FormatMetadata>,
}

impl VideoMetadata {
    /// Returns the declared download size in bytes, preferring the exact
    /// figure over the estimate. Zero and missing values yield `None`.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn declared_size(&self) -> Option<u64> {
        self.filesize
            .filter(|size| *size > 0.0)
            .or_else(|| self.filesize_approx.filter(|size| *size > 0.0))
            .map(|size| size as u64)
    }

    /// Finds the format with the given identifier.
    #[must_use]
    pub fn format(&self, format_id: &str) -> Option<&FormatMetadata> {
        self.formats
            .iter()
            .find(|format| format.format_id.as_deref() == Some(format_id))
    }
}
