//! Plain HTTP handlers: catalog listing and format preview.

use axum::Json;
use axum::extract::State;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::catalog::DownloadRecord;
use crate::preview::VideoPreview;

use super::AppState;
use super::error::ApiError;

/// Request body for the preview endpoint.
#[derive(Debug, Deserialize)]
pub(super) struct PreviewRequest {
    /// The URL to preview; missing and empty are treated the same.
    #[serde(default)]
    pub(super) url: String,
}

/// Lists every recorded download, oldest first.
pub(super) async fn home(State(state): State<AppState>) -> Json<Vec<DownloadRecord>> {
    Json(state.catalog.load().await)
}

/// Builds a preview for a submitted URL.
///
/// Rejected URLs are the client's fault (400); extraction failures are
/// reported as 500 with the extractor's reason as the detail.
#[instrument(skip_all)]
pub(super) async fn preview(
    State(state): State<AppState>,
    Json(request): Json<PreviewRequest>,
) -> Result<Json<VideoPreview>, ApiError> {
    if request.url.is_empty() {
        return Err(ApiError::bad_request("URL must not be empty"));
    }
    if !state.validator.is_valid(&request.url) {
        return Err(ApiError::bad_request("Invalid URL"));
    }

    debug!(url = %request.url, "building preview");
    match state.preview.preview(&request.url).await {
        Ok(preview) => Ok(Json(preview)),
        Err(err) => Err(ApiError::internal(err.to_string())),
    }
}
