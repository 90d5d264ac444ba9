//! The relay endpoint handler.
//!
//! Each request runs straight through: validate credentials, build the
//! truncated prompt, one blocking backend call, then paced chunk emission.
//! Nothing is shared across requests and nothing is retried; every failure
//! is terminal for its request.

use axum::body::Body;
use axum::extract::{Json, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use tokio::time::Instant;

use crate::api::{ChatMessage, RelayErrorBody, RelayRequest};
use crate::server::backend::GenerationParams;
use crate::server::pacer::{paced_stream, MAX_STREAM_DURATION, STREAM_DELAY};
use crate::server::AppState;

/// Context-window truncation policy: only this many trailing messages reach
/// the backend prompt. Older history is discarded.
pub const PROMPT_CONTEXT_MESSAGES: usize = 3;

#[derive(Debug)]
pub enum RelayError {
    /// `apiKey` or `model` absent or empty; reported as a client error.
    MissingCredentials,
    /// The backend call failed; reported as a generic server error with a
    /// human-readable detail string.
    Backend(String),
    /// The response itself could not be assembled.
    Internal(String),
}

impl std::fmt::Display for RelayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelayError::MissingCredentials => write!(f, "API key and model are required"),
            RelayError::Backend(details) => write!(f, "backend failure: {details}"),
            RelayError::Internal(details) => write!(f, "internal failure: {details}"),
        }
    }
}

impl std::error::Error for RelayError {}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            RelayError::MissingCredentials => (
                StatusCode::BAD_REQUEST,
                RelayErrorBody {
                    error: "API key and model are required".to_string(),
                    details: None,
                },
            ),
            RelayError::Backend(details) | RelayError::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                RelayErrorBody {
                    error: "Internal server error".to_string(),
                    details: Some(details),
                },
            ),
        };
        (status, axum::Json(body)).into_response()
    }
}

/// Format the trailing slice of the conversation as the backend prompt, one
/// `role: content` line per message.
pub fn build_prompt(messages: &[ChatMessage]) -> String {
    let start = messages.len().saturating_sub(PROMPT_CONTEXT_MESSAGES);
    messages[start..]
        .iter()
        .map(|msg| format!("{}: {}", msg.role, msg.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// `POST /api/chat`
pub async fn relay_chat(
    State(state): State<AppState>,
    Json(request): Json<RelayRequest>,
) -> Result<Response, RelayError> {
    if request.api_key.trim().is_empty() || request.model.trim().is_empty() {
        return Err(RelayError::MissingCredentials);
    }

    let prompt = build_prompt(&request.messages);
    let text = state
        .generator
        .generate(
            &request.api_key,
            &request.model,
            &prompt,
            &GenerationParams::default(),
        )
        .await
        .map_err(|err| {
            tracing::warn!(model = %request.model, error = %err, "backend call failed");
            RelayError::Backend(err.to_string())
        })?;

    tracing::info!(
        model = %request.model,
        prompt_messages = request.messages.len().min(PROMPT_CONTEXT_MESSAGES),
        chars = text.chars().count(),
        "relaying completion as paced stream"
    );

    let deadline = Instant::now() + MAX_STREAM_DURATION;
    let body = Body::from_stream(paced_stream(text, STREAM_DELAY, deadline));
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream; charset=utf-8")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .body(body)
        .map_err(|err| RelayError::Internal(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(role: &str, content: &str) -> ChatMessage {
        ChatMessage {
            role: role.to_string(),
            content: content.to_string(),
        }
    }

    #[test]
    fn prompt_uses_only_the_last_three_messages() {
        let messages = vec![
            msg("user", "one"),
            msg("assistant", "two"),
            msg("user", "three"),
            msg("user", "four"),
        ];
        assert_eq!(
            build_prompt(&messages),
            "assistant: two\nuser: three\nuser: four"
        );
    }

    #[test]
    fn prompt_keeps_exactly_three_messages_at_the_boundary() {
        let messages = vec![
            msg("user", "one"),
            msg("assistant", "two"),
            msg("user", "three"),
        ];
        assert_eq!(build_prompt(&messages), "user: one\nassistant: two\nuser: three");
    }

    #[test]
    fn prompt_with_a_single_message_has_no_separator() {
        let messages = vec![msg("user", "hi")];
        assert_eq!(build_prompt(&messages), "user: hi");
    }

    #[test]
    fn prompt_of_empty_history_is_empty() {
        assert_eq!(build_prompt(&[]), "");
    }
}
