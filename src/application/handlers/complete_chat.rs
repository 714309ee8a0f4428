//! Unary chat-completion pipeline.

use std::sync::Arc;
use std::time::Instant;

use tracing::info;

use crate::application::{Accountant, AttemptLoop};
use crate::domain::chat::{ChatRequest, ChatResponse};
use crate::domain::foundation::{GatewayError, TokenCount};
use crate::domain::routing::Router;

/// Orchestrates one unary request: validate, route, attempt, account.
pub struct CompleteChatHandler {
    router: Router,
    attempt_loop: AttemptLoop,
    accountant: Arc<Accountant>,
}

impl CompleteChatHandler {
    /// Creates the handler from its collaborators.
    pub fn new(router: Router, attempt_loop: AttemptLoop, accountant: Arc<Accountant>) -> Self {
        Self {
            router,
            attempt_loop,
            accountant,
        }
    }

    /// Runs the full pipeline and returns the assembled response.
    pub async fn handle(&self, request: ChatRequest) -> Result<ChatResponse, GatewayError> {
        request.validate()?;

        let estimate = request.estimated_tokens();
        let initial_model = self.router.select(estimate, request.model.as_ref())?;
        let started = Instant::now();

        let success = self.attempt_loop.execute(&request, initial_model).await?;
        let response_time = started.elapsed();

        // Upstreams that do not report usage return zeros; fall back to the
        // routing estimate for input and a length-based estimate for output.
        let input_tokens = if success.input_tokens == 0 {
            estimate
        } else {
            TokenCount::new(success.input_tokens)
        };
        let output_tokens = if success.output_tokens == 0 {
            TokenCount::from_text(&success.content)
        } else {
            TokenCount::new(success.output_tokens)
        };

        let estimated_cost = self
            .accountant
            .track(
                &success.model_used,
                input_tokens,
                output_tokens,
                response_time,
                success.was_fallback(),
            )
            .await;

        info!(
            model = %success.model_used,
            attempts = success.attempts,
            tokens = (input_tokens + output_tokens).as_u32(),
            elapsed_ms = response_time.as_millis() as u64,
            "chat completion served"
        );

        Ok(ChatResponse {
            content: success.content,
            model: success.model_used,
            tokens_used: input_tokens + output_tokens,
            estimated_cost,
            response_time,
        })
    }
}
