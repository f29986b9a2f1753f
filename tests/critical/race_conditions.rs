//! Phase 1 (P0): racing writers against the shared catalog and the gate.
//! Concurrent appends must all land; the gate must hold its admission cap.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tubedown_core::catalog::{Catalog, DownloadRecord};
use tubedown_core::session::ProgressEvent;

use crate::support::scripted::{
    DownloadScript, ScriptedExtractor, metadata, run_session, session_for,
};

const MB: u64 = 1024 * 1024;
const URL: &str = "https://www.youtube.com/watch?v=abc123";

fn record(tag: usize) -> DownloadRecord {
    DownloadRecord {
        title: format!("Clip {tag}"),
        duration: 10.0,
        uploader: "Example Channel".to_string(),
        description: String::new(),
        filename: format!("clip_{tag}.mp4"),
        download_date: "2026-08-01 12:30:00".to_string(),
        filesize: 1024,
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn p0_concurrent_catalog_appends_lose_no_records() {
    let temp_dir = TempDir::new().expect("temp dir");
    let catalog = Arc::new(Catalog::new(temp_dir.path().join("videos_info.json")));

    let mut tasks = Vec::new();
    for tag in 0..16 {
        let catalog = Arc::clone(&catalog);
        tasks.push(tokio::spawn(async move {
            catalog.append(record(tag)).await.expect("append");
        }));
    }
    for task in tasks {
        task.await.expect("append task");
    }

    let records = catalog.load().await;
    assert_eq!(records.len(), 16, "every concurrent append must survive");
    for tag in 0..16 {
        let filename = format!("clip_{tag}.mp4");
        assert!(
            records.iter().any(|r| r.filename == filename),
            "record {tag} missing after concurrent appends"
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn p0_gate_caps_streaming_concurrency() {
    let temp_dir = TempDir::new().expect("temp dir");
    let extractor = Arc::new(
        ScriptedExtractor::new(
            temp_dir.path(),
            metadata("Clip", None),
            DownloadScript::Store {
                file_name: "clip_{n}.mp4".to_string(),
                size: 1024,
                samples: Vec::new(),
            },
        )
        .with_hold(Duration::from_millis(50)),
    );
    let (session, catalog) = session_for(Arc::clone(&extractor), temp_dir.path(), 500 * MB, 3);

    let mut tasks = Vec::new();
    for _ in 0..8 {
        let session = Arc::clone(&session);
        tasks.push(tokio::spawn(
            async move { run_session(&session, URL, "18").await },
        ));
    }
    for task in tasks {
        let events = task.await.expect("session task");
        assert!(
            matches!(events.last(), Some(ProgressEvent::Complete { .. })),
            "every queued session should finish: {events:?}"
        );
    }

    assert_eq!(extractor.downloads_started(), 8, "no session may be dropped");
    assert!(
        extractor.peak_concurrency() <= 3,
        "gate admitted {} concurrent downloads, capacity is 3",
        extractor.peak_concurrency()
    );
    assert_eq!(catalog.load().await.len(), 8);
}
