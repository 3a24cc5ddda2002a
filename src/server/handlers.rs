//! HTTP handlers

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
    Json,
};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::state::AppState;
use crate::chat::{ChatAnswer, StreamEvent};
use crate::error::NlqError;

/// Interval between SSE keep-alive comments.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(15);

/// Body of `POST /chat`.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub question: String,
}

/// Query string of `GET /chat-stream`.
#[derive(Debug, Deserialize)]
pub struct StreamParams {
    #[serde(default)]
    pub question: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Error response for a statement that failed to execute.
#[derive(Debug, Serialize)]
pub struct ExecutionErrorResponse {
    pub sql: String,
    pub error: String,
}

/// Maps pipeline errors onto HTTP responses.
///
/// Execution failures are the caller's to inspect (400 with the attempted
/// SQL); everything else is a server-side failure (500).
#[derive(Debug)]
pub struct ApiError(pub NlqError);

impl From<NlqError> for ApiError {
    fn from(err: NlqError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self.0 {
            NlqError::Execution { sql, message } => {
                tracing::debug!("Returning execution error: {message}");
                (
                    StatusCode::BAD_REQUEST,
                    Json(ExecutionErrorResponse {
                        sql,
                        error: message,
                    }),
                )
                    .into_response()
            }
            other => {
                tracing::error!("{}: {}", other.category(), other.detail());
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        error: other.detail().to_string(),
                    }),
                )
                    .into_response()
            }
        }
    }
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, ApiError> {
    state.service.health().await?;
    Ok(Json(json!({ "ok": true })))
}

/// Answers a question in one response.
pub async fn chat(
    State(state): State<AppState>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatAnswer>, ApiError> {
    let answer = state.service.answer(&req.question).await?;
    Ok(Json(answer))
}

/// Answers a question as a server-sent event stream.
pub async fn chat_stream(
    State(state): State<AppState>,
    Query(params): Query<StreamParams>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let events = state
        .service
        .clone()
        .answer_stream(params.question)
        .map(|event| Ok(to_sse_event(&event)));

    Sse::new(events).keep_alive(KeepAlive::new().interval(KEEP_ALIVE_INTERVAL))
}

fn to_sse_event(event: &StreamEvent) -> Event {
    Event::default()
        .event(event.name())
        .data(event.payload().to_string())
}
