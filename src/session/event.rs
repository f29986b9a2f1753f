//! Progress events sent to clients over the download channel.
//!
//! Events are JSON objects discriminated by a `status` field. Each
//! connection has one writer task fed by a bounded queue; [`EventSender`] is
//! the producing half. The queue preserves order, and a full queue applies
//! backpressure to the session instead of dropping or reordering updates.

use serde::Serialize;
use tokio::sync::mpsc;
use tracing::debug;

use crate::catalog::DownloadRecord;
use crate::extractor::ProgressSample;

/// One event on the wire, discriminated by `status`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProgressEvent {
    /// Informational note about the current stage.
    Info {
        /// Human-readable message.
        message: String,
    },
    /// Bytes are flowing.
    Downloading {
        /// Bytes received so far.
        downloaded_bytes: u64,
        /// Total expected bytes, zero when unknown.
        total_bytes: u64,
        /// Transfer rate in bytes per second.
        speed: f64,
        /// Estimated seconds remaining.
        eta: u64,
    },
    /// The transfer finished; verification may still follow.
    Finished,
    /// The download completed and was recorded.
    Complete {
        /// The catalog record for the stored file.
        video_info: DownloadRecord,
    },
    /// The download failed or was rejected.
    Error {
        /// Human-readable reason.
        error: String,
    },
}

impl ProgressEvent {
    /// Creates an informational event.
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    /// Creates an error event.
    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    /// Creates a completion event carrying the stored record.
    #[must_use]
    pub fn complete(video_info: DownloadRecord) -> Self {
        Self::Complete { video_info }
    }
}

impl From<ProgressSample> for ProgressEvent {
    fn from(sample: ProgressSample) -> Self {
        match sample {
            ProgressSample::Downloading {
                downloaded_bytes,
                total_bytes,
                speed,
                eta,
            } => Self::Downloading {
                downloaded_bytes,
                total_bytes,
                speed,
                eta,
            },
            ProgressSample::Finished => Self::Finished,
        }
    }
}

/// Producing half of a connection's outbound event queue.
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: mpsc::Sender<ProgressEvent>,
}

impl EventSender {
    /// Creates a bounded event queue of the given depth.
    #[must_use]
    pub fn channel(depth: usize) -> (Self, mpsc::Receiver<ProgressEvent>) {
        let (tx, rx) = mpsc::channel(depth);
        (Self { tx }, rx)
    }

    /// Queues `event` for the connection writer, waiting while the queue is
    /// full. Once the writer is gone the event is dropped silently; a
    /// session keeps running after its client disconnects.
    pub async fn send(&self, event: ProgressEvent) {
        if self.tx.send(event).await.is_err() {
            debug!("event dropped, connection writer is gone");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_event_info_wire_shape() {
        let value = serde_json::to_value(ProgressEvent::info("Fetching video information...")).unwrap();
        assert_eq!(value["status"], "info");
        assert_eq!(value["message"], "Fetching video information...");
    }

    #[test]
    fn test_event_downloading_wire_shape() {
        let event = ProgressEvent::Downloading {
            downloaded_bytes: 1_048_576,
            total_bytes: 10_485_760,
            speed: 524_288.0,
            eta: 18,
        };
        let value = serde_json::to_value(event).unwrap();
        assert_eq!(value["status"], "downloading");
        assert_eq!(value["downloaded_bytes"], 1_048_576);
        assert_eq!(value["total_bytes"], 10_485_760);
        assert_eq!(value["speed"], 524_288.0);
        assert_eq!(value["eta"], 18);
    }

    #[test]
    fn test_event_finished_wire_shape() {
        let value = serde_json::to_value(ProgressEvent::Finished).unwrap();
        assert_eq!(value, serde_json::json!({"status": "finished"}));
    }

    #[test]
    fn test_event_complete_wire_shape() {
        let record = DownloadRecord {
            title: "Clip".to_string(),
            duration: 212.0,
            uploader: "Example Channel".to_string(),
            description: String::new(),
            filename: "Clip.mp4".to_string(),
            download_date: "2025-06-01 12:30:00".to_string(),
            filesize: 1_048_576,
        };
        let value = serde_json::to_value(ProgressEvent::complete(record)).unwrap();
        assert_eq!(value["status"], "complete");
        assert_eq!(value["video_info"]["title"], "Clip");
        assert_eq!(value["video_info"]["filename"], "Clip.mp4");
        assert_eq!(value["video_info"]["filesize"], 1_048_576);
    }

    #[test]
    fn test_event_error_wire_shape() {
        let value = serde_json::to_value(ProgressEvent::error("Invalid URL")).unwrap();
        assert_eq!(value["status"], "error");
        assert_eq!(value["error"], "Invalid URL");
    }

    #[test]
    fn test_event_from_progress_sample() {
        let sample = ProgressSample::Downloading {
            downloaded_bytes: 10,
            total_bytes: 100,
            speed: 1.5,
            eta: 60,
        };
        assert_eq!(
            ProgressEvent::from(sample),
            ProgressEvent::Downloading {
                downloaded_bytes: 10,
                total_bytes: 100,
                speed: 1.5,
                eta: 60,
            }
        );
        assert_eq!(ProgressEvent::from(ProgressSample::Finished), ProgressEvent::Finished);
    }

    #[tokio::test]
    async fn test_event_sender_delivers_in_order() {
        let (sender, mut rx) = EventSender::channel(8);
        sender.send(ProgressEvent::info("one")).await;
        sender.send(ProgressEvent::Finished).await;

        assert_eq!(rx.recv().await.unwrap(), ProgressEvent::info("one"));
        assert_eq!(rx.recv().await.unwrap(), ProgressEvent::Finished);
    }

    #[tokio::test]
    async fn test_event_sender_tolerates_closed_receiver() {
        let (sender, rx) = EventSender::channel(1);
        drop(rx);
        sender.send(ProgressEvent::Finished).await;
    }
}
