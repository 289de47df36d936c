//! Route handler functions for the HTTP endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use medibook_core::Location;
use medibook_dialogue::{DialogueError, ToolResult};

use crate::error::ApiError;
use crate::state::AppState;

/// Session key used when a chat request names no chat.
pub const DEFAULT_CHAT: &str = "default";

const SERVICE_NAME: &str = "Voice Agent MCP Service";

// =============================================================================
// Request types
// =============================================================================

/// Request body for POST /chat.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default, rename = "chatId")]
    pub chat_id: Option<String>,
}

/// Request body for POST /chat/reset.
#[derive(Debug, Default, Deserialize)]
pub struct ResetRequest {
    #[serde(default, rename = "chatId")]
    pub chat_id: Option<String>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct RootResponse {
    pub service: String,
    pub status: String,
    pub ollama_model: String,
    pub whisper_model: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub active_sessions: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CapabilitiesResponse {
    pub whisper_available: bool,
    pub ollama_model: String,
    pub whisper_model: Option<String>,
}

/// Response body for POST /chat. `chatId` echoes the request.
#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub tool_result: Option<ToolResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(rename = "chatId")]
    pub chat_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResetResponse {
    pub status: String,
    #[serde(rename = "chatId")]
    pub chat_id: String,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET / - service banner.
pub async fn root(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        service: SERVICE_NAME.to_string(),
        status: "running".to_string(),
        ollama_model: state.config.llm.model.clone(),
        whisper_model: state.config.voice.whisper_model.clone(),
    })
}

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        active_sessions: state.registry.len(),
    })
}

/// GET /capabilities - which input modes are available.
pub async fn capabilities(State(state): State<AppState>) -> Json<CapabilitiesResponse> {
    let whisper_available = state.transcriber.is_some();
    Json(CapabilitiesResponse {
        whisper_available,
        ollama_model: state.config.llm.model.clone(),
        whisper_model: whisper_available.then(|| state.config.voice.whisper_model.clone()),
    })
}

/// POST /chat - run one text turn.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let key = session_key(req.chat_id.as_deref());
    let turn = state
        .registry
        .process_message(key, &req.message, req.location)
        .await
        .map_err(|e| {
            tracing::debug!(session = %key, error = %e, "Rejected chat message");
            ApiError::from(e)
        })?;

    Ok(Json(ChatResponse {
        response: turn.reply,
        tool_result: turn.tool_result,
        error: turn.error,
        chat_id: req.chat_id,
    }))
}

/// POST /chat/reset - reset a chat to its initial state.
pub async fn chat_reset(
    State(state): State<AppState>,
    body: Option<Json<ResetRequest>>,
) -> Result<Json<ResetResponse>, ApiError> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let key = session_key(req.chat_id.as_deref()).to_string();
    state.registry.reset(&key).await?;

    Ok(Json(ResetResponse {
        status: "reset".to_string(),
        chat_id: key,
    }))
}

/// DELETE /chat/{id} - drop a chat session.
pub async fn delete_chat(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    if state.registry.evict(&id) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(DialogueError::SessionNotFound(id).into())
    }
}

fn session_key(chat_id: Option<&str>) -> &str {
    chat_id
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .unwrap_or(DEFAULT_CHAT)
}
