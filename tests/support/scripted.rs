//! Scripted stand-in for the external extraction engine.
//!
//! Sessions drive a [`VideoExtractor`]; tests swap in this implementation to
//! run whole download flows in-process with no network and no subprocess.
//! The script fixes what the metadata says and what the download stage does,
//! and counters record how the extractor was used.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tubedown_core::catalog::Catalog;
use tubedown_core::extractor::{
    DownloadedFile, ExtractorError, FormatMetadata, ProgressSample, VideoExtractor, VideoMetadata,
};
use tubedown_core::limit::DownloadGate;
use tubedown_core::session::{DownloadSession, EventSender, ProgressEvent};

/// What the download stage does when a session reaches it.
pub enum DownloadScript {
    /// Forward `samples`, then write a file of `size` bytes.
    ///
    /// A `{n}` in `file_name` is replaced with a per-extractor call counter
    /// so concurrent downloads land in distinct files.
    Store {
        file_name: String,
        size: u64,
        samples: Vec<ProgressSample>,
    },
    /// Fail with an engine-style message; no file is written.
    Fail { message: String },
}

/// A [`VideoExtractor`] that follows a fixed script.
pub struct ScriptedExtractor {
    download_dir: PathBuf,
    metadata: Result<VideoMetadata, String>,
    script: DownloadScript,
    hold: Duration,
    downloads_started: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
}

impl ScriptedExtractor {
    /// Creates an extractor that serves `metadata` and then follows `script`.
    pub fn new(
        download_dir: impl Into<PathBuf>,
        metadata: VideoMetadata,
        script: DownloadScript,
    ) -> Self {
        Self {
            download_dir: download_dir.into(),
            metadata: Ok(metadata),
            script,
            hold: Duration::ZERO,
            downloads_started: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Creates an extractor whose metadata fetch fails with `message`.
    pub fn failing_metadata(download_dir: impl Into<PathBuf>, message: &str) -> Self {
        Self {
            download_dir: download_dir.into(),
            metadata: Err(message.to_string()),
            script: DownloadScript::Fail {
                message: "unreachable".to_string(),
            },
            hold: Duration::ZERO,
            downloads_started: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Keeps each download in flight for `hold` before it completes.
    pub fn with_hold(mut self, hold: Duration) -> Self {
        self.hold = hold;
        self
    }

    /// How many times the download stage was entered.
    pub fn downloads_started(&self) -> usize {
        self.downloads_started.load(Ordering::SeqCst)
    }

    /// The most downloads ever observed in flight at once.
    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VideoExtractor for ScriptedExtractor {
    async fn fetch_metadata(&self, _url: &str) -> Result<VideoMetadata, ExtractorError> {
        match &self.metadata {
            Ok(metadata) => Ok(metadata.clone()),
            Err(message) => Err(ExtractorError::failed(message.clone())),
        }
    }

    async fn download(
        &self,
        _url: &str,
        _format_id: &str,
        progress: mpsc::Sender<ProgressSample>,
    ) -> Result<DownloadedFile, ExtractorError> {
        let call = self.downloads_started.fetch_add(1, Ordering::SeqCst);
        let in_flight = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(in_flight, Ordering::SeqCst);

        if !self.hold.is_zero() {
            tokio::time::sleep(self.hold).await;
        }

        let result = match &self.script {
            DownloadScript::Store {
                file_name,
                size,
                samples,
            } => {
                for sample in samples {
                    let _ = progress.send(sample.clone()).await;
                }
                let name = file_name.replace("{n}", &call.to_string());
                let path = self.download_dir.join(name);
                match tokio::fs::write(&path, vec![0u8; usize::try_from(*size).unwrap()]).await {
                    Ok(()) => Ok(DownloadedFile { path }),
                    Err(err) => Err(ExtractorError::io(err)),
                }
            }
            DownloadScript::Fail { message } => Err(ExtractorError::failed(message.clone())),
        };

        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// Metadata with headline fields filled in and an optional declared size
/// (reported as the approximate figure, like most live videos).
pub fn metadata(title: &str, declared_size: Option<f64>) -> VideoMetadata {
    VideoMetadata {
        title: Some(title.to_string()),
        duration: Some(212.0),
        uploader: Some("Example Channel".to_string()),
        description: Some("A test clip".to_string()),
        thumbnail: Some("https://i.example.com/thumb.jpg".to_string()),
        filesize_approx: declared_size,
        ..VideoMetadata::default()
    }
}

/// One format entry with an exact declared size.
pub fn format_entry(id: &str, filesize: Option<f64>) -> FormatMetadata {
    FormatMetadata {
        format_id: Some(id.to_string()),
        ext: Some("mp4".to_string()),
        quality: Some(2.0),
        filesize,
        format_note: Some("720p".to_string()),
        ..FormatMetadata::default()
    }
}

/// Wires a session around `extractor` with a fresh catalog in `dir` and a
/// gate of the given capacity.
pub fn session_for(
    extractor: Arc<ScriptedExtractor>,
    dir: &Path,
    max_file_size: u64,
    gate_capacity: usize,
) -> (Arc<DownloadSession>, Arc<Catalog>) {
    let catalog = Arc::new(Catalog::new(dir.join("videos_info.json")));
    let gate = Arc::new(DownloadGate::new(gate_capacity).expect("valid gate capacity"));
    let session = Arc::new(DownloadSession::new(
        extractor,
        Arc::clone(&catalog),
        gate,
        max_file_size,
    ));
    (session, catalog)
}

/// Runs one session to its terminal event and returns everything emitted,
/// in order.
pub async fn run_session(
    session: &DownloadSession,
    url: &str,
    format_id: &str,
) -> Vec<ProgressEvent> {
    let (events, mut rx) = EventSender::channel(64);
    let collector = tokio::spawn(async move {
        let mut seen = Vec::new();
        while let Some(event) = rx.recv().await {
            seen.push(event);
        }
        seen
    });

    session.run(url, format_id, &events).await;
    drop(events);
    collector.await.expect("event collector task")
}
