//! Attempt loop - drives one request across the fallback chain.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::domain::chat::ChatRequest;
use crate::domain::foundation::{GatewayError, ModelId};
use crate::domain::routing::FallbackChain;
use crate::ports::{ChatProvider, ProviderError, ProviderRequest};

/// Temperature used when the caller does not specify one.
pub const DEFAULT_TEMPERATURE: f32 = 0.7;

/// Generation budget used when the caller does not specify one.
pub const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Model-level attempt budget per request. Retries inside the resilience
/// layer are separate and do not count against this.
pub const MAX_ATTEMPTS: u32 = 3;

/// Outcome of a successful attempt.
#[derive(Debug, Clone)]
pub struct AttemptSuccess {
    /// Generated content.
    pub content: String,
    /// Prompt tokens as reported by the upstream (zero when unreported).
    pub input_tokens: u32,
    /// Generated tokens as reported by the upstream (zero when unreported).
    pub output_tokens: u32,
    /// The model that produced the response.
    pub model_used: ModelId,
    /// Number of attempts made, including the successful one.
    pub attempts: u32,
}

impl AttemptSuccess {
    /// True iff the success came from any attempt after the first.
    pub fn was_fallback(&self) -> bool {
        self.attempts > 1
    }
}

/// Sequentially tries models from the fallback chain until one succeeds.
///
/// Each attempt goes through the provider port (normally the resilience
/// decorator); transient failures roll to the next chain member, terminal
/// failures abort immediately.
pub struct AttemptLoop {
    provider: Arc<dyn ChatProvider>,
    fallback: FallbackChain,
    max_attempts: u32,
}

impl AttemptLoop {
    /// Creates an attempt loop with the default attempt budget.
    pub fn new(provider: Arc<dyn ChatProvider>, fallback: FallbackChain) -> Self {
        Self {
            provider,
            fallback,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Overrides the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Builds the single-attempt request for a model, applying defaults.
    pub(crate) fn provider_request(request: &ChatRequest, model: &ModelId) -> ProviderRequest {
        ProviderRequest {
            model: model.clone(),
            messages: request.messages.clone(),
            temperature: request.temperature.unwrap_or(DEFAULT_TEMPERATURE),
            max_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
        }
    }

    /// Runs the attempt protocol and returns the first success.
    pub async fn execute(
        &self,
        request: &ChatRequest,
        initial_model: ModelId,
    ) -> Result<AttemptSuccess, GatewayError> {
        let mut current = initial_model;
        let mut attempted: Vec<ModelId> = Vec::new();
        let mut attempts = 0u32;

        loop {
            attempted.push(current.clone());
            attempts += 1;
            debug!(model = %current, attempt = attempts, "invoking provider");

            let outcome = self
                .provider
                .complete(Self::provider_request(request, &current))
                .await;

            // An empty completion counts as a transient failure of this attempt.
            let failure: Option<ProviderError> = match outcome {
                Ok(completion) if !completion.content.is_empty() => {
                    return Ok(AttemptSuccess {
                        content: completion.content,
                        input_tokens: completion.input_tokens,
                        output_tokens: completion.output_tokens,
                        model_used: current,
                        attempts,
                    });
                }
                Ok(_) => {
                    warn!(model = %current, "provider returned an empty completion");
                    None
                }
                Err(error) => Some(error),
            };

            let transient = failure.as_ref().map_or(true, ProviderError::is_transient);
            if transient && attempts < self.max_attempts {
                warn!(
                    model = %current,
                    attempt = attempts,
                    error = ?failure,
                    "attempt failed, consulting fallback chain"
                );
                // Chain errors (unknown model, exhausted chain) are terminal.
                current = self.fallback.next(&current, &attempted)?;
                continue;
            }

            return Err(Self::terminal_error(failure, attempted));
        }
    }

    fn terminal_error(failure: Option<ProviderError>, attempted: Vec<ModelId>) -> GatewayError {
        match failure {
            // Transient failure on the final attempt: the chain is spent.
            None => GatewayError::AllProvidersFailed { attempted },
            Some(error) if error.is_transient() => {
                GatewayError::AllProvidersFailed { attempted }
            }
            Some(ProviderError::Cancelled) => GatewayError::Cancelled,
            Some(ProviderError::Status { code, message }) => {
                GatewayError::UpstreamTerminal { code, message }
            }
            Some(ProviderError::Parse(message)) => {
                GatewayError::Internal(format!("unreadable upstream response: {message}"))
            }
            Some(other) => GatewayError::Internal(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::ai::{MockChatProvider, ScriptedOutcome};
    use crate::domain::chat::ChatMessage;

    fn model(id: &str) -> ModelId {
        ModelId::new(id).unwrap()
    }

    fn chain() -> FallbackChain {
        FallbackChain::new(vec![model("g/large"), model("a/balanced"), model("o/default")])
            .unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest::new(vec![ChatMessage::user("hello")])
    }

    fn status(code: u16) -> ScriptedOutcome {
        ScriptedOutcome::Error(ProviderError::Status {
            code,
            message: "upstream failure".into(),
        })
    }

    #[tokio::test]
    async fn first_attempt_success_is_not_fallback() {
        let provider = Arc::new(
            MockChatProvider::new().with_completion("hi there", 100, 200),
        );
        let attempt_loop = AttemptLoop::new(provider.clone(), chain());

        let success = attempt_loop
            .execute(&request(), model("o/default"))
            .await
            .unwrap();

        assert_eq!(success.content, "hi there");
        assert_eq!(success.attempts, 1);
        assert!(!success.was_fallback());
        assert_eq!(success.model_used, model("o/default"));
        assert_eq!(provider.unary_calls().len(), 1);
    }

    #[tokio::test]
    async fn transient_failure_rolls_to_next_model() {
        let provider = Arc::new(
            MockChatProvider::new()
                .with_outcome(status(503))
                .with_completion("recovered", 10, 20),
        );
        let attempt_loop = AttemptLoop::new(provider.clone(), chain());

        let success = attempt_loop
            .execute(&request(), model("o/default"))
            .await
            .unwrap();

        assert_eq!(success.attempts, 2);
        assert!(success.was_fallback());
        // Circular scan from the default model wraps to the chain head.
        assert_eq!(success.model_used, model("g/large"));
        let calls = provider.unary_calls();
        assert_eq!(calls[0].model, model("o/default"));
        assert_eq!(calls[1].model, model("g/large"));
    }

    #[tokio::test]
    async fn empty_completion_is_treated_as_transient() {
        let provider = Arc::new(
            MockChatProvider::new()
                .with_completion("", 0, 0)
                .with_completion("second try", 10, 20),
        );
        let attempt_loop = AttemptLoop::new(provider, chain());

        let success = attempt_loop
            .execute(&request(), model("g/large"))
            .await
            .unwrap();

        assert_eq!(success.content, "second try");
        assert_eq!(success.attempts, 2);
    }

    #[tokio::test]
    async fn exhausted_chain_yields_all_providers_failed() {
        let provider = Arc::new(
            MockChatProvider::new()
                .with_outcome(status(500))
                .with_outcome(status(500))
                .with_outcome(status(500)),
        );
        let attempt_loop = AttemptLoop::new(provider.clone(), chain());

        let result = attempt_loop.execute(&request(), model("g/large")).await;

        match result {
            Err(GatewayError::AllProvidersFailed { attempted }) => {
                assert_eq!(attempted.len(), 3);
            }
            other => panic!("expected AllProvidersFailed, got {other:?}"),
        }
        assert_eq!(provider.unary_calls().len(), 3);
    }

    #[tokio::test]
    async fn terminal_status_aborts_without_fallback() {
        let provider = Arc::new(
            MockChatProvider::new()
                .with_outcome(status(401))
                .with_completion("never reached", 1, 1),
        );
        let attempt_loop = AttemptLoop::new(provider.clone(), chain());

        let result = attempt_loop.execute(&request(), model("g/large")).await;

        assert!(matches!(
            result,
            Err(GatewayError::UpstreamTerminal { code: 401, .. })
        ));
        assert_eq!(provider.unary_calls().len(), 1);
    }

    #[tokio::test]
    async fn cancellation_aborts_without_fallback() {
        let provider = Arc::new(
            MockChatProvider::new().with_outcome(ScriptedOutcome::Error(ProviderError::Cancelled)),
        );
        let attempt_loop = AttemptLoop::new(provider.clone(), chain());

        let result = attempt_loop.execute(&request(), model("g/large")).await;

        assert!(matches!(result, Err(GatewayError::Cancelled)));
        assert_eq!(provider.unary_calls().len(), 1);
    }

    #[tokio::test]
    async fn model_outside_chain_fails_terminally_on_fallback() {
        let provider = Arc::new(MockChatProvider::new().with_outcome(status(503)));
        let attempt_loop = AttemptLoop::new(provider, chain());

        let result = attempt_loop.execute(&request(), model("x/unlisted")).await;

        assert!(matches!(result, Err(GatewayError::ModelUnknown(_))));
    }

    #[tokio::test]
    async fn applies_default_temperature_and_budget() {
        let provider = Arc::new(MockChatProvider::new().with_completion("ok", 1, 1));
        let attempt_loop = AttemptLoop::new(provider.clone(), chain());

        attempt_loop
            .execute(&request(), model("o/default"))
            .await
            .unwrap();

        let calls = provider.unary_calls();
        assert!((calls[0].temperature - DEFAULT_TEMPERATURE).abs() < f32::EPSILON);
        assert_eq!(calls[0].max_tokens, DEFAULT_MAX_TOKENS);
    }
}
