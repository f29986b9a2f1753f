//! Extractor backed by the `yt-dlp` command-line binary.
//!
//! # Overview
//!
//! Metadata comes from `yt-dlp --dump-json` (no media transfer); downloads
//! run as a spawned child process whose stdout is read line by line for
//! progress samples and destination notices. The final file name is taken
//! from the last destination notice seen, with only its last path component
//! trusted, so the stored file always sits directly in the download
//! directory.

use std::collections::VecDeque;
use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use crate::config::Config;

use super::progress::{PROGRESS_TEMPLATE, parse_progress_line};
use super::{DownloadedFile, ExtractorError, ProgressSample, VideoExtractor, VideoMetadata};

/// Socket timeout handed to the extractor, in seconds.
const SOCKET_TIMEOUT_SECS: u32 = 30;

/// Transfer retry count handed to the extractor.
const TRANSFER_RETRIES: u32 = 10;

/// How many trailing stderr lines are kept for failure reports.
const STDERR_TAIL_LINES: usize = 10;

/// Compiles a regex at static init; panics on invalid pattern.
fn compile_static_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|e| panic!("invalid static regex '{pattern}': {e}"))
}

static DESTINATION_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^\[download\] Destination: (.+)$"));
static MERGED_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r#"^\[Merger\] Merging formats into "(.+)"$"#));
static ALREADY_DOWNLOADED_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^\[download\] (.+) has already been downloaded$"));
static EXTRACT_AUDIO_RE: LazyLock<Regex> =
    LazyLock::new(|| compile_static_regex(r"^\[ExtractAudio\] Destination: (.+)$"));

/// Returns the output path named by a destination notice, if `line` is one.
///
/// Callers keep the last match: merge and audio-extraction notices come
/// after the per-stream destination lines and name the surviving file.
fn parse_destination_line(line: &str) -> Option<&str> {
    let line = line.trim();
    for pattern in [
        &DESTINATION_RE,
        &MERGED_RE,
        &ALREADY_DOWNLOADED_RE,
        &EXTRACT_AUDIO_RE,
    ] {
        if let Some(captures) = pattern.captures(line) {
            return captures.get(1).map(|m| m.as_str());
        }
    }
    None
}

/// Returns the last non-blank lines of `text`, newest last.
fn tail_of(text: &str) -> String {
    let lines: Vec<&str> = text.lines().filter(|line| !line.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

/// [`VideoExtractor`] implementation that shells out to `yt-dlp`.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    binary: PathBuf,
    download_dir: PathBuf,
    proxy: Option<String>,
}

impl YtDlpExtractor {
    /// Creates an extractor running `binary` and storing media in `download_dir`.
    #[must_use]
    pub fn new(
        binary: impl Into<PathBuf>,
        download_dir: impl Into<PathBuf>,
        proxy: Option<String>,
    ) -> Self {
        Self {
            binary: binary.into(),
            download_dir: download_dir.into(),
            proxy,
        }
    }

    /// Creates an extractor from the service configuration.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.ytdlp_bin.clone(),
            config.download_dir.clone(),
            config.proxy.clone(),
        )
    }

    fn binary_name(&self) -> String {
        self.binary.display().to_string()
    }
}

#[async_trait]
impl VideoExtractor for YtDlpExtractor {
    #[instrument(skip(self), fields(binary = %self.binary.display()))]
    async fn fetch_metadata(&self, url: &str) -> Result<VideoMetadata, ExtractorError> {
        let mut command = Command::new(&self.binary);
        command.args(["--dump-json", "--no-warnings", "--no-playlist"]);
        if let Some(proxy) = &self.proxy {
            command.args(["--proxy", proxy]);
        }
        command.arg(url);
        command.stdin(Stdio::null());

        let output = command
            .output()
            .await
            .map_err(|err| ExtractorError::spawn(self.binary_name(), err))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(status = %output.status, "metadata fetch failed");
            return Err(ExtractorError::failed(tail_of(&stderr)));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let payload = stdout.trim();
        if payload.is_empty() {
            return Err(ExtractorError::no_metadata(url));
        }

        let metadata = serde_json::from_str(payload).map_err(ExtractorError::invalid_metadata)?;
        debug!("metadata fetched");
        Ok(metadata)
    }

    #[instrument(skip(self, progress), fields(binary = %self.binary.display()))]
    async fn download(
        &self,
        url: &str,
        format_id: &str,
        progress: mpsc::Sender<ProgressSample>,
    ) -> Result<DownloadedFile, ExtractorError> {
        let output_template = self.download_dir.join("%(title)s.%(ext)s");

        let mut command = Command::new(&self.binary);
        command.arg("-f").arg(format_id);
        command.arg("-o").arg(&output_template);
        command.args(["--newline", "--progress-template", PROGRESS_TEMPLATE]);
        command.arg("--socket-timeout").arg(SOCKET_TIMEOUT_SECS.to_string());
        command.arg("--retries").arg(TRANSFER_RETRIES.to_string());
        command.args(["--no-check-certificates", "--no-playlist"]);
        if let Some(proxy) = &self.proxy {
            command.args(["--proxy", proxy]);
        }
        command.arg(url);
        command.stdin(Stdio::null());
        command.stdout(Stdio::piped());
        command.stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|err| ExtractorError::spawn(self.binary_name(), err))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExtractorError::io(io::Error::other("child stdout not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExtractorError::io(io::Error::other("child stderr not captured")))?;

        let stderr_task = tokio::spawn(async move {
            let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                if line.trim().is_empty() {
                    continue;
                }
                if tail.len() == STDERR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            tail.into_iter().collect::<Vec<_>>().join("\n")
        });

        let mut output_name: Option<String> = None;
        let mut lines = BufReader::new(stdout).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if let Some(sample) = parse_progress_line(&line) {
                // The receiver disappears when the client hangs up; the
                // transfer itself keeps running either way.
                let _ = progress.send(sample).await;
                continue;
            }
            if let Some(name) = parse_destination_line(&line) {
                debug!(name, "output file reported");
                output_name = Some(name.to_string());
            }
        }

        let status = child.wait().await.map_err(ExtractorError::io)?;
        let stderr_tail = stderr_task.await.unwrap_or_default();

        if !status.success() {
            warn!(status = %status, "download process failed");
            return Err(ExtractorError::failed(stderr_tail));
        }

        let name = output_name.ok_or_else(|| ExtractorError::output_missing(url))?;
        let file_name = Path::new(&name)
            .file_name()
            .ok_or_else(|| ExtractorError::output_missing(url))?;

        Ok(DownloadedFile {
            path: self.download_dir.join(file_name),
        })
    }
}
