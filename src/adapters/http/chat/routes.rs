//! Axum routes for the chat endpoints.

use axum::routing::post;
use axum::Router;

use super::handlers::{complete_chat, stream_chat, ChatAppState};

/// Creates routes for the chat endpoints.
///
/// - POST /v1/chat/completions - unary completion
/// - POST /v1/chat/completions/stream - SSE streaming completion
pub fn chat_routes() -> Router<ChatAppState> {
    Router::new()
        .route("/v1/chat/completions", post(complete_chat))
        .route("/v1/chat/completions/stream", post(stream_chat))
}

/// Combined router with the state applied.
pub fn chat_router(state: ChatAppState) -> Router {
    chat_routes().with_state(state)
}
