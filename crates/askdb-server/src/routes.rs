//! HTTP surface: the WebSocket endpoint and a health check.

use crate::session::{Session, SessionContext};
use crate::state::AppState;
use axum::extract::ws::{WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use futures::StreamExt;
use serde_json::json;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;
use tracing::warn;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(handle_ws))
        .route("/health", get(handle_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn handle_ws(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    let ctx = state.session_context();
    let shutdown = state.shutdown_signal();
    ws.on_upgrade(move |socket| run_session(ctx, socket, shutdown))
}

async fn run_session(ctx: SessionContext, socket: WebSocket, shutdown: watch::Receiver<bool>) {
    let (sink, stream) = socket.split();
    match Session::start(&ctx, stream, sink) {
        Ok(session) => session.run_until_shutdown(shutdown).await,
        Err(e) => warn!(error = %e, "failed to start session"),
    }
}

async fn handle_health(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "service": "askdb-server",
        "version": env!("CARGO_PKG_VERSION"),
        "sessions": state.registry.len(),
    }))
}
