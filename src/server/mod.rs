//! HTTP surface of the service.
//!
//! # Overview
//!
//! Three routes make up the whole API: the catalog listing at `/`, the
//! format preview at `/api/preview`, and the download channel at
//! `/ws/download`. Stored media is served statically under `/downloads`.
//! CORS is wide open; the service is designed to sit behind whatever
//! front end the operator pairs it with.
//!
//! The listener either binds a pinned port or scans a small fixed range for
//! the first free one, refusing to start when the whole range is taken.

mod error;
mod routes;
mod ws;

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use thiserror::Error;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::config::{self, Config};
use crate::extractor::VideoExtractor;
use crate::limit::{DownloadGate, GateError, RateLimiter};
use crate::preview::PreviewService;
use crate::validation::UrlValidator;

pub use error::ApiError;

/// Errors that keep the server from starting.
#[derive(Debug, Error)]
pub enum ServeError {
    /// Every port in the scan range was taken.
    #[error("no free port between {} and {}", config::BASE_PORT, config::PORT_SCAN_END - 1)]
    NoFreePort,

    /// A pinned address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that failed to bind.
        addr: SocketAddr,
        /// The underlying I/O error.
        #[source]
        source: io::Error,
    },
}

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub(crate) config: Arc<Config>,
    pub(crate) limiter: Arc<RateLimiter>,
    pub(crate) gate: Arc<DownloadGate>,
    pub(crate) validator: Arc<UrlValidator>,
    pub(crate) extractor: Arc<dyn VideoExtractor>,
    pub(crate) catalog: Arc<Catalog>,
    pub(crate) preview: Arc<PreviewService>,
}

impl AppState {
    /// Wires the shared services from the configuration.
    ///
    /// # Errors
    ///
    /// Returns a [`GateError`] when the configured concurrency is not a
    /// valid gate capacity.
    pub fn new(config: Config, extractor: Arc<dyn VideoExtractor>) -> Result<Self, GateError> {
        let gate = Arc::new(DownloadGate::new(config.max_concurrent_downloads)?);
        let limiter = Arc::new(RateLimiter::per_minute(config.max_requests_per_minute));
        let validator = Arc::new(UrlValidator::new(config.allowed_domains.clone()));
        let catalog = Arc::new(Catalog::new(config.catalog_file.clone()));
        let preview = Arc::new(PreviewService::new(
            Arc::clone(&extractor),
            config.max_file_size,
        ));

        Ok(Self {
            config: Arc::new(config),
            limiter,
            gate,
            validator,
            extractor,
            catalog,
            preview,
        })
    }
}

/// Builds the service router.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let downloads = ServeDir::new(&state.config.download_dir);

    Router::new()
        .route("/", get(routes::home))
        .route("/api/preview", post(routes::preview))
        .route("/ws/download", get(ws::ws_download))
        .nest_service("/downloads", downloads)
        .with_state(state)
        .layer(cors)
}

/// Binds the listener, scanning the port range when no port is pinned.
///
/// # Errors
///
/// Returns [`ServeError::Bind`] when a pinned address cannot be bound, or
/// [`ServeError::NoFreePort`] when the scan exhausts its range.
pub async fn bind_available_port(config: &Config) -> Result<TcpListener, ServeError> {
    if let Some(port) = config.port {
        let addr = SocketAddr::new(config.bind_addr, port);
        return TcpListener::bind(addr)
            .await
            .map_err(|source| ServeError::Bind { addr, source });
    }

    for port in config::BASE_PORT..config::PORT_SCAN_END {
        let addr = SocketAddr::new(config.bind_addr, port);
        match TcpListener::bind(addr).await {
            Ok(listener) => {
                info!(%addr, "listener bound");
                return Ok(listener);
            }
            Err(err) => {
                debug!(%addr, error = %err, "port taken, trying next");
            }
        }
    }

    Err(ServeError::NoFreePort)
}
