//! Static asset delivery.

use std::path::Path;

use axum::extract::Request;
use axum::response::{IntoResponse, Response};
use tower::ServiceExt;
use tower_http::services::ServeFile;

/// Serves an already-resolved file. Content type, conditional requests and
/// ranges are handled by [`ServeFile`].
pub async fn asset_handler(file: &Path, request: Request) -> Response {
    match ServeFile::new(file).oneshot(request).await {
        Ok(response) => response.into_response(),
        Err(never) => match never {},
    }
}
