use super::state::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn not_found(message: &str) -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
        .into_response()
}

/// GET /session/status
/// Live status of the bot session
pub async fn get_session_status(State(state): State<AppState>) -> impl IntoResponse {
    match state.status.get().await {
        Some(status) => (StatusCode::OK, Json(status)).into_response(),
        None => not_found("No session has started"),
    }
}

/// GET /session/artifact
/// Recording and speaker timeframes of a terminated session
pub async fn get_session_artifact(State(state): State<AppState>) -> impl IntoResponse {
    match state.status.artifact().await {
        Some(artifact) => (StatusCode::OK, Json(artifact)).into_response(),
        None => not_found("Session has not finished"),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
