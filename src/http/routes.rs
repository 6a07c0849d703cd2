//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Path, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer};
use tracing::info;
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{RoomError, RoundState};
use crate::util::time::uptime_secs;
use crate::ws::handler::ws_handler;
use crate::ws::protocol::{ControllerStatus, LeaderboardEntry};

/// Upper bound for a console or leaderboard request
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    // CORS configuration - support multiple origins (comma-separated in CLIENT_ORIGIN)
    let allowed_origins: Vec<header::HeaderValue> = state
        .config
        .client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    // Request/response routes, bounded in time
    let api_routes = Router::new()
        .route("/health", get(health_handler))
        .route("/leaderboard", get(leaderboard_handler))
        .route("/controllers/:peer_id", get(controller_handler))
        .route("/round/launch", post(launch_handler))
        .route("/round/reset", post(reset_handler))
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT));

    // Long-lived sockets
    let socket_routes = Router::new().route("/ws", get(ws_handler));

    Router::new()
        .merge(api_routes)
        .merge(socket_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new())
                .layer(cors),
        )
        .with_state(state)
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
    players: usize,
    max_peers: usize,
    connections: usize,
    replicated_fields: usize,
}

async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
        players: state.room.peer_count(),
        max_peers: state.config.room.max_peers,
        connections: state.presence.len(),
        replicated_fields: state.room.replicated_fields(),
    })
}

// ============================================================================
// Room views
// ============================================================================

#[derive(Serialize)]
struct LeaderboardResponse {
    entries: Vec<LeaderboardEntry>,
}

async fn leaderboard_handler(State(state): State<AppState>) -> Result<Json<LeaderboardResponse>, AppError> {
    let entries = state.room.leaderboard().await?;
    Ok(Json(LeaderboardResponse { entries }))
}

async fn controller_handler(
    State(state): State<AppState>,
    Path(peer_id): Path<Uuid>,
) -> Result<Json<ControllerStatus>, AppError> {
    state
        .room
        .controller_status(peer_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No combatant for peer {peer_id}")))
}

// ============================================================================
// Host console
// ============================================================================

#[derive(Serialize)]
struct LaunchResponse {
    launched: bool,
}

#[derive(Serialize)]
struct ResetResponse {
    round: RoundState,
}

async fn launch_handler(State(state): State<AppState>) -> Result<Json<LaunchResponse>, AppError> {
    check_console(&state)?;
    let launched = state.room.launch().await?;
    info!(launched, "Launch requested from console");
    Ok(Json(LaunchResponse { launched }))
}

async fn reset_handler(State(state): State<AppState>) -> Result<Json<ResetResponse>, AppError> {
    check_console(&state)?;
    let round = state.room.reset().await?;
    info!("Reset requested from console");
    Ok(Json(ResetResponse { round }))
}

fn check_console(state: &AppState) -> Result<(), AppError> {
    state
        .console_limiter
        .check()
        .map_err(|_| AppError::TooManyRequests)
}

// ============================================================================
// Error handling
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many requests")]
    TooManyRequests,

    #[error(transparent)]
    Room(#[from] RoomError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::TooManyRequests => StatusCode::TOO_MANY_REQUESTS,
            AppError::Room(RoomError::Closed) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Room(_) => StatusCode::CONFLICT,
        };

        let body = serde_json::json!({
            "error": self.to_string()
        });

        (status, Json(body)).into_response()
    }
}
