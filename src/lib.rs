//! Tubedown Core Library
//!
//! This library implements a small web service for downloading videos: a
//! client submits a URL, previews the available formats, and triggers a
//! download whose progress streams back over a WebSocket. All media handling
//! is delegated to an external extractor binary; this crate supplies the
//! orchestration around it: admission control, size policy, progress relay,
//! and the catalog of completed downloads.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Load-time settings with environment overrides
//! - [`limit`] - Admission control: per-client rate limits and the download gate
//! - [`validation`] - Allowed-domain URL checking
//! - [`extractor`] - The external engine seam and its yt-dlp implementation
//! - [`preview`] - Metadata-only format previews
//! - [`session`] - The per-download flow and its progress events
//! - [`catalog`] - Flat JSON record store of completed downloads
//! - [`server`] - HTTP routes and the WebSocket download channel
//! - [`cleanup`] - Periodic removal of old downloaded files

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod catalog;
pub mod cleanup;
pub mod config;
pub mod extractor;
pub mod limit;
pub mod preview;
pub mod server;
pub mod session;
pub mod validation;

// Re-export commonly used types
pub use catalog::{Catalog, CatalogError, DownloadRecord};
pub use config::{Config, ConfigError};
pub use extractor::{ExtractorError, VideoExtractor, YtDlpExtractor};
pub use limit::{DownloadGate, GateError, RateLimiter};
pub use preview::{PreviewService, VideoPreview};
pub use server::{AppState, ServeError, bind_available_port, build_router};
pub use session::{DownloadSession, EventSender, ProgressEvent, SessionError};
pub use validation::UrlValidator;
