//! Phase 1 (P0): catalog corruption and recovery.
//! A damaged or missing catalog must never take the service down; history is
//! best-effort and a failed write must not fail the session that produced it.

use std::sync::Arc;

use tempfile::TempDir;
use tubedown_core::catalog::{Catalog, DownloadRecord};
use tubedown_core::extractor::VideoExtractor;
use tubedown_core::limit::DownloadGate;
use tubedown_core::session::{DownloadSession, ProgressEvent};

use crate::support::scripted::{DownloadScript, ScriptedExtractor, metadata, run_session};

const MB: u64 = 1024 * 1024;
const URL: &str = "https://www.youtube.com/watch?v=abc123";

fn sample_record() -> DownloadRecord {
    DownloadRecord {
        title: "Clip".to_string(),
        duration: 212.0,
        uploader: "Example Channel".to_string(),
        description: String::new(),
        filename: "Clip.mp4".to_string(),
        download_date: "2026-08-01 12:30:00".to_string(),
        filesize: 1024,
    }
}

#[tokio::test]
async fn p0_corrupt_catalog_degrades_to_empty() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("videos_info.json");
    tokio::fs::write(&path, b"{not json at all")
        .await
        .expect("write garbage");

    let catalog = Catalog::new(path);
    assert!(
        catalog.load().await.is_empty(),
        "corrupt catalog should read as empty, not error"
    );
}

#[tokio::test]
async fn p0_missing_catalog_reads_empty() {
    let temp_dir = TempDir::new().expect("temp dir");
    let catalog = Catalog::new(temp_dir.path().join("never_written.json"));
    assert!(catalog.load().await.is_empty());
}

#[tokio::test]
async fn p0_append_recovers_from_corrupt_catalog() {
    let temp_dir = TempDir::new().expect("temp dir");
    let path = temp_dir.path().join("videos_info.json");
    tokio::fs::write(&path, b"\0\0\0 binary junk \0")
        .await
        .expect("write garbage");

    let catalog = Catalog::new(path.clone());
    catalog.append(sample_record()).await.expect("append");

    let records = catalog.load().await;
    assert_eq!(records.len(), 1, "append should reset the damaged file");
    assert_eq!(records[0].title, "Clip");

    // The file itself must be valid JSON again.
    let raw = tokio::fs::read_to_string(&path).await.expect("read back");
    serde_json::from_str::<serde_json::Value>(&raw).expect("rewritten catalog parses");
}

#[tokio::test]
async fn p0_catalog_write_failure_does_not_fail_session() {
    let temp_dir = TempDir::new().expect("temp dir");
    let extractor: Arc<ScriptedExtractor> = Arc::new(ScriptedExtractor::new(
        temp_dir.path(),
        metadata("Clip", None),
        DownloadScript::Store {
            file_name: "Clip.mp4".to_string(),
            size: 1024,
            samples: Vec::new(),
        },
    ));

    // Point the catalog into a directory that does not exist, so every
    // write fails while the download itself succeeds.
    let catalog = Arc::new(Catalog::new(
        temp_dir.path().join("missing_dir").join("videos_info.json"),
    ));
    let gate = Arc::new(DownloadGate::new(1).expect("gate"));
    let session = DownloadSession::new(
        Arc::clone(&extractor) as Arc<dyn VideoExtractor>,
        Arc::clone(&catalog),
        gate,
        500 * MB,
    );

    let events = run_session(&session, URL, "18").await;
    assert!(
        matches!(events.last(), Some(ProgressEvent::Complete { .. })),
        "history is best-effort; the session must still complete: {events:?}"
    );
    assert!(
        tokio::fs::try_exists(temp_dir.path().join("Clip.mp4"))
            .await
            .expect("stat"),
        "the downloaded file must survive the failed catalog write"
    );
    assert!(catalog.load().await.is_empty());
}
