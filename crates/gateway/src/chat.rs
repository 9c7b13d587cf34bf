//! `POST /api/chat`: one exchange with the assistant.
//!
//! The client sends its recent history with every request; nothing is kept
//! between requests. With `stream: true` (the default) the response is an
//! event stream of `data:` records, one per orchestrator event. Otherwise
//! the final assistant text comes back as JSON.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{
        IntoResponse, Response,
        sse::{Event as SseEvent, Sse},
    },
};
use cocochat_agent::encoder::encode;
use cocochat_agent::{Orchestrator, OrchestratorError};
use cocochat_core::message::{Content, Message, MessageLog, Role};
use cocochat_core::tool::ToolCall;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, info, warn};

/// Shared state for the chat routes.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub system_prompt: String,
}

pub type SharedState = Arc<AppState>;

// ── Request / Response types ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub recent_history: Vec<HistoryTurn>,
    pub user_message_content: String,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

fn default_stream() -> bool {
    true
}

/// A prior turn as the client remembers it.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryTurn {
    pub role: Role,
    #[serde(default)]
    pub content: Content,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default)]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Errors the chat endpoint reports as JSON.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Exchange(OrchestratorError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            Self::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            Self::Exchange(e) => {
                let status = match &e {
                    OrchestratorError::ModelCallFailed(_) => StatusCode::BAD_GATEWAY,
                    _ => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
        };
        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

// ── History ───────────────────────────────────────────────────────────────

/// Build the message log for an exchange.
///
/// The server's system prompt always comes first. Client `system` turns
/// are ignored, and a turn that would break the log's tool-call
/// references is dropped rather than failing the request.
pub fn build_log(system_prompt: &str, history: Vec<HistoryTurn>, user_message: &str) -> MessageLog {
    let mut log = MessageLog::with_system_prompt(system_prompt);

    for (position, turn) in history.into_iter().enumerate() {
        let message = match turn.role {
            Role::System => {
                warn!(position, "Dropping client-supplied system turn");
                continue;
            }
            Role::User => Message::user(turn.content.as_text()),
            Role::Assistant => {
                Message::assistant_with_tool_calls(turn.content.as_text(), turn.tool_calls)
            }
            Role::Tool => match turn.tool_call_id {
                Some(id) if log.has_tool_call(&id) => {
                    Message::tool_result(id, turn.name.unwrap_or_default(), turn.content)
                }
                _ => {
                    warn!(position, "Dropping tool turn with no matching tool call");
                    continue;
                }
            },
        };

        if let Err(e) = log.push(message) {
            warn!(position, error = %e, "Dropping inconsistent history turn");
        }
    }

    // A user message never carries tool calls, so this cannot fail.
    if let Err(e) = log.push(Message::user(user_message)) {
        error!(error = %e, "Failed to append user message");
    }
    log
}

// ── Handler ───────────────────────────────────────────────────────────────

pub async fn chat_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ChatRequest>,
) -> Result<Response, ApiError> {
    if payload.user_message_content.trim().is_empty() {
        return Err(ApiError::BadRequest(
            "user_message_content must not be empty".into(),
        ));
    }

    info!(
        history = payload.recent_history.len(),
        stream = payload.stream,
        "Chat request received"
    );

    let log = build_log(
        &state.system_prompt,
        payload.recent_history,
        &payload.user_message_content,
    );

    if !payload.stream {
        let reply = state
            .orchestrator
            .reply(log)
            .await
            .map_err(ApiError::Exchange)?;
        return Ok(Json(ChatResponse {
            content: reply.content,
        })
        .into_response());
    }

    // Dropping the response body drops the receiver, which cancels the exchange.
    let rx = state.orchestrator.spawn(log);
    let stream = ReceiverStream::new(rx)
        .map(|event| Ok::<_, Infallible>(SseEvent::default().data(encode(&event).to_json())));

    Ok(Sse::new(stream).into_response())
}

pub async fn health_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "healthy" }))
}
