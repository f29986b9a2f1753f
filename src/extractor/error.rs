//! Error types for the extractor module.

use std::io;

use thiserror::Error;

/// Errors that can occur while fetching metadata or downloading media.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// The extractor binary could not be started.
    #[error("failed to run '{binary}': {source}")]
    Spawn {
        /// The binary that failed to start.
        binary: String,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },

    /// The extractor ran but reported failure.
    #[error("extraction failed: {detail}")]
    Failed {
        /// Trailing stderr output from the extractor.
        detail: String,
    },

    /// The extractor produced no metadata for the URL.
    #[error("no video information returned for {url}")]
    NoMetadata {
        /// The URL that yielded nothing.
        url: String,
    },

    /// The metadata output could not be parsed.
    #[error("unreadable video information: {source}")]
    InvalidMetadata {
        /// The underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// The download finished but the output file could not be located.
    #[error("download finished but no output file was reported for {url}")]
    OutputMissing {
        /// The URL whose output went missing.
        url: String,
    },

    /// I/O failure while driving the extractor process.
    #[error("extractor I/O error: {source}")]
    Io {
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

impl ExtractorError {
    /// Creates a spawn error for the given binary.
    pub fn spawn(binary: impl Into<String>, source: io::Error) -> Self {
        Self::Spawn {
            binary: binary.into(),
            source,
        }
    }

    /// Creates a failure error carrying extractor stderr output.
    pub fn failed(detail: impl Into<String>) -> Self {
        Self::Failed {
            detail: detail.into(),
        }
    }

    /// Creates a missing-metadata error.
    pub fn no_metadata(url: impl Into<String>) -> Self {
        Self::NoMetadata { url: url.into() }
    }

    /// Creates a metadata parse error.
    #[must_use]
    pub fn invalid_metadata(source: serde_json::Error) -> Self {
        Self::InvalidMetadata { source }
    }

    /// Creates a missing-output error.
    pub fn output_missing(url: impl Into<String>) -> Self {
        Self::OutputMissing { url: url.into() }
    }

    /// Creates an I/O error.
    #[must_use]
    pub fn io(source: io::Error) -> Self {
        Self::Io { source }
    }
}

// No From<io::Error> here: spawn failures need the binary name and plain
// I/O failures do not, so callers pick the constructor with the context
// they have.
