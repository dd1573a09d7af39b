//! `GET /`: the dashboard page.

use axum::response::{Html, IntoResponse, Response};

use crate::app_state::AppState;
use crate::error::StatusError;

/// Renders `index.html` from the asset root with the template variables
/// substituted. A missing template answers 404.
pub async fn root_handler(state: &AppState) -> Response {
    let index = state.assets.index_page();
    match tokio::fs::read_to_string(&index).await {
        Ok(template) => Html(state.variables.render(&template)).into_response(),
        Err(err) => {
            tracing::warn!(path = %index.display(), error = %err, "dashboard template unavailable");
            StatusError::NotFound("/".to_string()).into_response()
        }
    }
}
