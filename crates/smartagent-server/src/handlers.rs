//! HTTP Handlers

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use smartagent_core::{Conversation, SessionId};

use crate::state::AppState;

// ============================================================================
// Request / Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: SessionId,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub reply: String,
    pub history: Conversation,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub ok: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub session_id: SessionId,
    pub history: Conversation,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn session_not_found(id: &SessionId) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("session '{id}' not found"),
            code: "SESSION_NOT_FOUND".into(),
        }),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse { ok: true })
}

/// Run one chat turn against the caller's session
pub async fn chat_handler(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let mut session = state.sessions.checkout(&payload.session_id).await;

    let outcome = state
        .agent
        .run_turn(&session.conversation, &payload.message)
        .await;

    tracing::info!(
        session = %payload.session_id,
        stop = ?outcome.stop,
        hops = outcome.hops,
        "chat turn finished"
    );

    session.commit(outcome.history.clone());

    Json(ChatResponse {
        reply: outcome.reply,
        history: outcome.history,
    })
}

/// Persisted history of one session
pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionResponse>, ApiError> {
    let id = SessionId::from_string(id);
    let session = state
        .sessions
        .snapshot(&id)
        .await
        .ok_or_else(|| session_not_found(&id))?;

    Ok(Json(SessionResponse {
        session_id: session.id,
        history: session.conversation,
    }))
}

/// Forget a session
pub async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = SessionId::from_string(id);
    if state.sessions.remove(&id).await {
        tracing::info!(session = %id, "session removed");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(session_not_found(&id))
    }
}
