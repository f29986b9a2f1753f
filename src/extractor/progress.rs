//! Parsing of extractor progress lines.
//!
//! Downloads run with `--newline` and a JSON `--progress-template`, so each
//! progress update arrives on stdout as one line:
//!
//! ```text
//! download:{"status":"downloading","downloaded_bytes":1048576,"total_bytes":10485760,"speed":524288.0,"eta":18}
//! ```
//!
//! Anything that is not such a line (destination notices, merge messages,
//! warnings) is simply not a progress sample.

use serde::Deserialize;

/// Template passed to the extractor so progress arrives as parseable JSON.
///
/// Missing fields fall back to zero inside the template, so the output is
/// always valid JSON with every key present.
pub(crate) const PROGRESS_TEMPLATE: &str = concat!(
    "download:{\"status\":\"%(progress.status)s\",",
    "\"downloaded_bytes\":%(progress.downloaded_bytes|0)d,",
    "\"total_bytes\":%(progress.total_bytes|0)d,",
    "\"speed\":%(progress.speed|0)f,",
    "\"eta\":%(progress.eta|0)d}"
);

/// One progress update observed during a download.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressSample {
    /// Bytes are flowing.
    Downloading {
        /// Bytes received so far.
        downloaded_bytes: u64,
        /// Total expected bytes, zero when unknown.
        total_bytes: u64,
        /// Transfer rate in bytes per second, zero when unknown.
        speed: f64,
        /// Estimated seconds remaining, zero when unknown.
        eta: u64,
    },
    /// The transfer finished; post-processing may still follow.
    Finished,
}

#[derive(Debug, Deserialize)]
struct RawProgress {
    status: String,
    #[serde(default)]
    downloaded_bytes: u64,
    #[serde(default)]
    total_bytes: u64,
    #[serde(default)]
    speed: f64,
    #[serde(default)]
    eta: u64,
}

/// Parses one stdout line into a progress sample, if it is one.
#[must_use]
pub(crate) fn parse_progress_line(line: &str) -> Option<ProgressSample> {
    let payload = line.trim().strip_prefix("download:")?;
    let raw: RawProgress = serde_json::from_str(payload).ok()?;

    match raw.status.as_str() {
        "downloading" => Some(ProgressSample::Downloading {
            downloaded_bytes: raw.downloaded_bytes,
            total_bytes: raw.total_bytes,
            speed: raw.speed,
            eta: raw.eta,
        }),
        "finished" => Some(ProgressSample::Finished),
        _ => None,
    }
}
