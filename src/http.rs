//! HTTP surface
//!
//! Routes for room creation, room lookup and the WebSocket endpoint that
//! hands established connections to the session lifecycle.

use std::future::Future;
use std::sync::Arc;

use axum::{
    extract::{
        ws::{WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

use crate::error::AppError;
use crate::message::{ServerMessage, ROOM_NOT_FOUND_TEXT};
use crate::registry::RoomRegistry;
use crate::session::{run_session, SessionConfig};
use crate::types::RoomId;

/// Shared application state
///
/// The registry is owned here and handed to every handler; there is no
/// process-wide room map.
#[derive(Debug)]
pub struct AppState {
    pub registry: Arc<RoomRegistry>,
    pub session: SessionConfig,
}

impl AppState {
    pub fn new(registry: RoomRegistry, session: SessionConfig) -> Self {
        Self {
            registry: Arc::new(registry),
            session,
        }
    }
}

/// Query parameters for the WebSocket endpoint
#[derive(Debug, Deserialize)]
pub struct ConnectQuery {
    #[serde(rename = "roomID", default)]
    pub room_id: String,
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct RoomQuery {
    #[serde(rename = "roomID", default)]
    pub room_id: String,
}

#[derive(Debug, Serialize)]
pub struct CreateRoomResponse {
    #[serde(rename = "roomID")]
    pub room_id: RoomId,
}

#[derive(Debug, Serialize)]
pub struct RoomExistsResponse {
    pub exists: bool,
}

/// Build the application router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/create-room", post(create_room).get(create_room))
        .route("/room-exists", get(room_exists))
        .route("/ws", get(websocket_handler))
        .route("/api/health", get(health_check))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve the router on `listener` until `shutdown` resolves
pub async fn serve<F>(listener: TcpListener, state: Arc<AppState>, shutdown: F) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Room relay listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

pub async fn create_room(State(state): State<Arc<AppState>>) -> Json<CreateRoomResponse> {
    let room_id = state.registry.create_room().await;
    Json(CreateRoomResponse { room_id })
}

pub async fn room_exists(
    State(state): State<Arc<AppState>>,
    Query(query): Query<RoomQuery>,
) -> Result<Json<RoomExistsResponse>, (StatusCode, Json<ServerMessage>)> {
    if query.room_id.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ServerMessage::error("Room ID is required")),
        ));
    }

    if state.registry.exists(&RoomId(query.room_id)).await {
        Ok(Json(RoomExistsResponse { exists: true }))
    } else {
        Err((
            StatusCode::NOT_FOUND,
            Json(ServerMessage::error(ROOM_NOT_FOUND_TEXT)),
        ))
    }
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state, query))
}

async fn handle_socket(socket: WebSocket, state: Arc<AppState>, query: ConnectQuery) {
    let (sink, source) = socket.split();
    run_session(
        state.registry.clone(),
        &state.session,
        query.room_id,
        query.username,
        sink,
        source,
    )
    .await;
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
