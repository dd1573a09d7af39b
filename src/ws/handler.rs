//! WebSocket upgrade and per-connection lifecycle.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{FromRequestParts, Request};
use axum::response::{IntoResponse, Response};
use futures_util::StreamExt;
use futures_util::stream::SplitStream;

use super::session::{Session, WsSession};
use crate::app_state::AppState;

/// Upgrades `request` and hands the socket to [`run_session`].
///
/// A request that says `Upgrade: websocket` but fails the handshake
/// requirements gets Axum's rejection response.
pub async fn ws_handler(state: AppState, request: Request) -> Response {
    let (mut parts, _body) = request.into_parts();
    match WebSocketUpgrade::from_request_parts(&mut parts, &state).await {
        Ok(ws) => ws.on_upgrade(move |socket| run_session(socket, state)),
        Err(rejection) => {
            tracing::debug!(uri = %parts.uri, error = %rejection, "websocket handshake rejected");
            rejection.into_response()
        }
    }
}

/// Admits the socket into the registry, then drains inbound frames until
/// the client goes away.
///
/// Client frames carry no application meaning and are discarded. The write
/// half stays in the registry after the client disconnects; the next failed
/// broadcast removes it.
pub async fn run_session(socket: WebSocket, state: AppState) {
    let (sink, stream) = socket.split();
    let session = WsSession::new(sink);
    let session_id = session.id();

    if let Err(err) = state
        .registry
        .connect(session, state.replay.as_ref())
        .await
    {
        tracing::debug!(%session_id, error = %err, "websocket rejected during replay");
        return;
    }

    tracing::info!(%session_id, "websocket connected");
    drain(stream).await;
    tracing::debug!(%session_id, "websocket reader finished");
}

/// Reads and discards client frames until close or error.
async fn drain(mut stream: SplitStream<WebSocket>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) | Err(_) => break,
            Ok(_) => {}
        }
    }
}
