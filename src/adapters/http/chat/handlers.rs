//! HTTP handlers for the chat endpoints.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use axum::{Extension, Json};
use futures::StreamExt;

use crate::adapters::http::middleware::CorrelationId;
use crate::adapters::http::problem::ProblemDetails;
use crate::application::handlers::{CompleteChatHandler, StreamChatHandler};
use crate::domain::chat::ChatRequest;

use super::dto::{ChatCompletionRequest, ChatCompletionResponse, StreamFrameDto};

/// Shared state of the chat endpoints.
#[derive(Clone)]
pub struct ChatAppState {
    complete: Arc<CompleteChatHandler>,
    stream: Arc<StreamChatHandler>,
}

impl ChatAppState {
    /// Creates the state from the two pipeline handlers.
    pub fn new(complete: Arc<CompleteChatHandler>, stream: Arc<StreamChatHandler>) -> Self {
        Self { complete, stream }
    }
}

/// Binds the JSON body and converts it to the domain request, mapping both
/// failure shapes onto 400 ProblemDetails.
fn bind_request(
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
    correlation_id: &CorrelationId,
) -> Result<ChatRequest, ProblemDetails> {
    let Json(dto) = payload.map_err(|rejection| {
        ProblemDetails::new(
            StatusCode::BAD_REQUEST,
            "Invalid request",
            rejection.body_text(),
            correlation_id,
        )
    })?;
    dto.into_domain()
        .map_err(|error| ProblemDetails::from_error(&error, correlation_id))
}

/// POST /v1/chat/completions - unary chat completion.
pub async fn complete_chat(
    State(state): State<ChatAppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Response {
    let request = match bind_request(payload, &correlation_id) {
        Ok(request) => request,
        Err(problem) => return problem.into_response(),
    };

    match state.complete.handle(request).await {
        Ok(response) => {
            (StatusCode::OK, Json(ChatCompletionResponse::from(response))).into_response()
        }
        Err(error) => ProblemDetails::from_error(&error, &correlation_id).into_response(),
    }
}

/// POST /v1/chat/completions/stream - SSE chat completion.
///
/// Pre-stream failures (validation, routing) surface as ProblemDetails;
/// once streaming has begun the connection closes without a terminal frame
/// on failure.
pub async fn stream_chat(
    State(state): State<ChatAppState>,
    Extension(correlation_id): Extension<CorrelationId>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Response {
    let request = match bind_request(payload, &correlation_id) {
        Ok(request) => request,
        Err(problem) => return problem.into_response(),
    };

    match state.stream.handle(request).await {
        Ok(frames) => {
            let events =
                frames.map(|frame| Event::default().json_data(StreamFrameDto::from(frame)));
            let mut response = Sse::new(events).into_response();
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache"),
            );
            response
        }
        Err(error) => ProblemDetails::from_error(&error, &correlation_id).into_response(),
    }
}
