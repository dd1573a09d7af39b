//! HTTP layer: request classification, handlers and router composition.
//!
//! There is no route table. Every request goes through [`dispatch`], which
//! asks [`router::route`] for a [`HandlerKind`] and runs that handler.
//! Classification touches the filesystem, so it runs on the blocking pool.

pub mod handlers;
pub mod router;

use axum::Router;
use axum::extract::{Request, State};
use axum::http::{self, HeaderValue};
use axum::http::header::SERVER;
use axum::response::{IntoResponse, Response};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::config::SERVER_HEADER;
use crate::error::StatusError;
use crate::ws;

pub use router::{AssetRoot, HandlerKind, route};

/// Builds the complete application router.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .fallback(dispatch)
        .layer(SetResponseHeaderLayer::overriding(
            SERVER,
            HeaderValue::from_static(SERVER_HEADER),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs the handler [`route`] selects for `request`.
pub async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let (kind, request) = match classify(request, &state.assets).await {
        Ok(routed) => routed,
        Err(err) => {
            tracing::error!(error = %err, "could not classify request");
            return err.into_response();
        }
    };

    match kind {
        HandlerKind::WebSocket => ws::handler::ws_handler(state, request).await,
        HandlerKind::Root => handlers::root::root_handler(&state).await,
        HandlerKind::Asset(file) => handlers::asset::asset_handler(&file, request).await,
        HandlerKind::NotFound => {
            StatusError::NotFound(request.uri().path().to_string()).into_response()
        }
        HandlerKind::BadRequest => {
            StatusError::BadRequest("malformed request path".to_string()).into_response()
        }
    }
}

/// Runs [`route`] on tokio's blocking pool and hands the request back.
///
/// Only the request head crosses threads; the body stays here.
///
/// # Errors
///
/// Returns [`StatusError::Routing`] if the blocking task panicked or was
/// cancelled.
pub async fn classify(
    request: Request,
    assets: &AssetRoot,
) -> Result<(HandlerKind, Request), StatusError> {
    let (parts, body) = request.into_parts();
    let assets = assets.clone();

    let (kind, parts) = tokio::task::spawn_blocking(move || {
        let head = http::Request::from_parts(parts, ());
        let kind = route(&head, &assets);
        (kind, head.into_parts().0)
    })
    .await
    .map_err(|err| StatusError::Routing(err.to_string()))?;

    Ok((kind, http::Request::from_parts(parts, body)))
}
