//! # parley-server
//!
//! WebSocket transport for the signaling hub. Deliberately thin: each socket
//! gets a read loop that classifies inbound frames and dispatches them into
//! the hub, and a writer task that drains the peer's bounded outbound queue.
//! All room and membership decisions live in `parley-hub`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    response::Response,
    routing::get,
};
use futures_util::{SinkExt, StreamExt};
use parley_common::envelope::{self, ClientCommand, Inbound};
use parley_hub::{HubStats, SignalHub};
use serde::Serialize;
use tokio::sync::mpsc;

/// Server state shared across all connections.
#[derive(Clone)]
pub struct AppState {
    pub hub: SignalHub,
    /// Capacity of each peer's outbound queue.
    pub outbound_queue: usize,
}

/// Build the signaling router: the `/comm` WebSocket endpoint plus health
/// and stats for monitoring. Origins are unrestricted; peers carry no
/// credentials.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/comm", get(ws_handler))
        .route("/health", get(health))
        .route("/stats", get(stats))
        .layer(
            tower_http::cors::CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::Any)
                .allow_headers(tower_http::cors::Any),
        )
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// WebSocket upgrade handler.
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| handle_connection(socket, state))
}

/// Handle a single WebSocket connection for its whole lifetime.
async fn handle_connection(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    // Bounded outbound queue: the hub pushes, the writer task drains. If
    // this peer stops draining, the hub evicts it and closes the queue.
    let (tx, mut rx) = mpsc::channel::<String>(state.outbound_queue);
    let peer_id = state.hub.connect(tx).await;

    // ── Writer task ──────────────────────────────────────────────────────
    let send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    // ── Read loop ────────────────────────────────────────────────────────
    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => match envelope::decode(text.as_str()) {
                Ok(Inbound::Command(ClientCommand::Subscribe { room, is_owner })) => {
                    // rejection notices are sent by the hub; the error is log-only here
                    let _ = state.hub.subscribe(peer_id, &room, is_owner).await;
                }
                Ok(Inbound::Command(ClientCommand::Unsubscribe { .. })) => {
                    state.hub.unsubscribe(peer_id).await;
                }
                Ok(Inbound::Relay) => {
                    state.hub.relay(peer_id, text.as_str()).await;
                }
                Err(err) => {
                    tracing::debug!(peer = %peer_id, %err, "Dropped malformed frame");
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // ── Cleanup ──────────────────────────────────────────────────────────
    // Implicit unsubscribe even when the peer never sent one.
    state.hub.disconnect(peer_id).await;
    send_task.abort();
    tracing::debug!(peer = %peer_id, "Socket closed");
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    active_rooms: usize,
    connected_peers: usize,
}

/// Health check endpoint — for load balancers, monitoring, and Docker health checks.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let stats = state.hub.stats().await;
    Json(HealthResponse {
        status: "healthy".into(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_rooms: stats.active_rooms,
        connected_peers: stats.connected_peers,
    })
}

/// Room occupancy snapshot.
async fn stats(State(state): State<Arc<AppState>>) -> Json<HubStats> {
    Json(state.hub.stats().await)
}
