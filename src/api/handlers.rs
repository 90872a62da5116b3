//! HTTP request handlers

use super::assets::{page, serve_static};
use super::sse::sse_stream;
use super::types::{
    ErrorResponse, SessionResponse, SubmitResponse, SuccessResponse, TextRequest, VersionResponse,
};
use super::AppState;
use crate::runtime::{ConversationHandle, SessionError};
use crate::state_machine::ConversationSnapshot;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Pages
        .route("/", get(serve_home))
        .route("/chat", get(serve_chat))
        .route("/assets/*path", get(serve_static))
        // Session lifecycle
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session))
        .route("/api/sessions/:id/close", post(close_session))
        // SSE streaming
        .route("/api/sessions/:id/stream", get(stream_session))
        // User actions
        .route("/api/sessions/:id/input", post(update_input))
        .route("/api/sessions/:id/submit", post(submit_message))
        // Version
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Pages
// ============================================================

async fn serve_home() -> Response {
    page("index.html")
}

async fn serve_chat() -> Response {
    page("chat.html")
}

// ============================================================
// Session Lifecycle
// ============================================================

async fn create_session(
    State(state): State<AppState>,
) -> Result<Json<SessionResponse>, AppError> {
    let (id, handle) = state.sessions.create().await;
    let snapshot = handle.snapshot().await?;
    Ok(Json(SessionResponse { id, snapshot }))
}

async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ConversationSnapshot>, AppError> {
    let handle = lookup(&state, &id).await?;
    Ok(Json(handle.snapshot().await?))
}

async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SuccessResponse>, AppError> {
    if state.sessions.close(&id).await {
        Ok(Json(SuccessResponse { success: true }))
    } else {
        Err(AppError::NotFound(format!("Session not found: {id}")))
    }
}

// ============================================================
// SSE Streaming
// ============================================================

async fn stream_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    // The session ends when this stream does
    let (handle, watch) = state
        .sessions
        .watch(&id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))?;
    // Subscribe before reading the snapshot so no change falls in between
    let updates = handle.subscribe();
    let init = handle.snapshot().await?;
    Ok(sse_stream(init, updates, watch))
}

// ============================================================
// User Actions
// ============================================================

async fn update_input(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TextRequest>,
) -> Result<Json<SuccessResponse>, AppError> {
    let handle = lookup(&state, &id).await?;
    handle.set_input(req.text).await?;
    Ok(Json(SuccessResponse { success: true }))
}

async fn submit_message(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<TextRequest>,
) -> Result<Json<SubmitResponse>, AppError> {
    let handle = lookup(&state, &id).await?;
    let outcome = handle.submit(req.text).await?;
    Ok(Json(outcome.into()))
}

// ============================================================
// Version
// ============================================================

async fn get_version(State(state): State<AppState>) -> Json<VersionResponse> {
    Json(VersionResponse {
        version: env!("CARGO_PKG_VERSION"),
        answering_service: state.sessions.service_name().to_string(),
    })
}

async fn lookup(state: &AppState, id: &str) -> Result<ConversationHandle, AppError> {
    state
        .sessions
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Session not found: {id}")))
}

// ============================================================
// Error Handling
// ============================================================

#[derive(Debug)]
enum AppError {
    NotFound(String),
}

impl From<SessionError> for AppError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::Closed => AppError::NotFound(e.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
        };

        let body = Json(ErrorResponse::new(message));
        (status, body).into_response()
    }
}
