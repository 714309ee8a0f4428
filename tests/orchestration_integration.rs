//! Integration tests for the composed orchestration stack.
//!
//! Wires the resilience decorator, attempt loop, and accountant together
//! over the mock provider, exercising the interactions the unit tests
//! cannot see: retry-then-fallback composition, circuit state shared
//! across requests, and per-provider isolation.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use llm_gateway::adapters::ai::{MockChatProvider, ScriptedOutcome};
use llm_gateway::adapters::resilience::{
    CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState, ResilientProvider, RetryPolicy,
};
use llm_gateway::application::handlers::CompleteChatHandler;
use llm_gateway::application::{Accountant, AttemptLoop};
use llm_gateway::domain::chat::{ChatMessage, ChatRequest};
use llm_gateway::domain::foundation::{GatewayError, ModelId};
use llm_gateway::domain::pricing::Pricing;
use llm_gateway::domain::request_log::RequestLog;
use llm_gateway::domain::routing::{FallbackChain, Router, RoutingTable};
use llm_gateway::ports::{
    PricingLookup, ProviderError, RequestLogSink, StoreError,
};

// =============================================================================
// Test Infrastructure
// =============================================================================

struct NoPricing;

#[async_trait]
impl PricingLookup for NoPricing {
    async fn find_by_model(&self, _model: &ModelId) -> Result<Option<Pricing>, StoreError> {
        Ok(None)
    }
}

#[derive(Default)]
struct InMemorySink(Mutex<Vec<RequestLog>>);

#[async_trait]
impl RequestLogSink for InMemorySink {
    async fn save(&self, log: &RequestLog) -> Result<(), StoreError> {
        self.0.lock().unwrap().push(log.clone());
        Ok(())
    }
}

fn model(id: &str) -> ModelId {
    ModelId::new(id).unwrap()
}

fn routing_table() -> RoutingTable {
    RoutingTable {
        default_model: model("o/default"),
        large_context_model: model("g/large"),
        balanced_model: model("a/balanced"),
        standard_context_limit: 10_000,
        large_context_limit: 200_000,
    }
}

fn fallback_chain() -> FallbackChain {
    FallbackChain::new(vec![model("g/large"), model("a/balanced"), model("o/default")]).unwrap()
}

fn fast_retry(max_retries: u32) -> RetryPolicy {
    RetryPolicy {
        max_retries,
        base_delay: Duration::from_millis(1),
        max_jitter: Duration::ZERO,
    }
}

struct Stack {
    handler: CompleteChatHandler,
    mock: Arc<MockChatProvider>,
    breakers: Arc<CircuitBreakerRegistry>,
    sink: Arc<InMemorySink>,
}

fn stack(mock: MockChatProvider, retries: u32, failure_threshold: u32) -> Stack {
    let mock = Arc::new(mock);
    let breakers = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig {
        failure_threshold,
        cooldown: Duration::from_secs(30),
    }));
    let provider = Arc::new(
        ResilientProvider::new(SharedProvider(mock.clone()), breakers.clone())
            .with_retry_policy(fast_retry(retries)),
    );
    let sink = Arc::new(InMemorySink::default());
    let accountant = Arc::new(Accountant::new(Arc::new(NoPricing), sink.clone()));
    let handler = CompleteChatHandler::new(
        Router::new(routing_table()),
        AttemptLoop::new(provider, fallback_chain()),
        accountant,
    );
    Stack {
        handler,
        mock,
        breakers,
        sink,
    }
}

/// Adapter so the decorator can own a handle to the shared mock.
struct SharedProvider(Arc<MockChatProvider>);

#[async_trait]
impl llm_gateway::ports::ChatProvider for SharedProvider {
    async fn complete(
        &self,
        request: llm_gateway::ports::ProviderRequest,
    ) -> Result<llm_gateway::ports::Completion, ProviderError> {
        self.0.complete(request).await
    }

    async fn complete_stream(
        &self,
        request: llm_gateway::ports::ProviderRequest,
    ) -> Result<llm_gateway::ports::ChunkStream, ProviderError> {
        self.0.complete_stream(request).await
    }
}

fn request() -> ChatRequest {
    ChatRequest::new(vec![ChatMessage::user("hello")])
}

fn status_error(code: u16) -> ScriptedOutcome {
    ScriptedOutcome::Error(ProviderError::Status {
        code,
        message: "upstream failure".into(),
    })
}

// =============================================================================
// Composition scenarios
// =============================================================================

#[tokio::test]
async fn retry_recovers_before_any_model_fallback() {
    // One transient failure, then success: the resilience layer retries on
    // the same model and the attempt loop never rolls over.
    let stack = stack(
        MockChatProvider::new()
            .with_outcome(status_error(503))
            .with_completion("recovered", 10, 20),
        2,
        10,
    );

    let response = stack.handler.handle(request()).await.unwrap();

    assert_eq!(response.model, model("o/default"));
    let calls = stack.mock.unary_calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.model == model("o/default")));

    let logs = stack.sink.0.lock().unwrap();
    assert_eq!(logs.len(), 1);
    // Same-model retries are invisible to fallback accounting.
    assert!(!logs[0].was_fallback());
}

#[tokio::test]
async fn retries_exhausted_then_fallback_succeeds() {
    // Two failures burn the retry budget (1 retry) on the default model,
    // then the attempt loop switches models and succeeds.
    let stack = stack(
        MockChatProvider::new()
            .with_outcome(status_error(503))
            .with_outcome(status_error(503))
            .with_completion("from the next model", 10, 20),
        1,
        10,
    );

    let response = stack.handler.handle(request()).await.unwrap();

    assert_eq!(response.model, model("g/large"));
    let calls = stack.mock.unary_calls();
    assert_eq!(calls.len(), 3);
    assert_eq!(calls[0].model, model("o/default"));
    assert_eq!(calls[1].model, model("o/default"));
    assert_eq!(calls[2].model, model("g/large"));
    assert!(stack.sink.0.lock().unwrap()[0].was_fallback());
}

#[tokio::test]
async fn open_circuit_rolls_to_the_next_model_without_calls() {
    // Threshold 1: the first failure opens the default provider's circuit.
    // A second request then skips that provider entirely.
    let stack = stack(
        MockChatProvider::new()
            .with_outcome(status_error(500))
            .with_completion("first rescue", 1, 1)
            .with_completion("second rescue", 1, 1),
        0,
        1,
    );

    let first = stack.handler.handle(request()).await.unwrap();
    assert_eq!(first.model, model("g/large"));
    assert_eq!(
        stack.breakers.breaker_for("o").state(),
        CircuitState::Open
    );

    let second = stack.handler.handle(request()).await.unwrap();
    assert_eq!(second.model, model("g/large"));

    // Three upstream calls total: the opener, then one rescue per request.
    // The second request's default-model attempt was refused at the gate.
    assert_eq!(stack.mock.unary_calls().len(), 3);

    let logs = stack.sink.0.lock().unwrap();
    assert_eq!(logs.len(), 2);
    assert!(logs.iter().all(|log| log.was_fallback()));
}

#[tokio::test]
async fn breaker_state_is_isolated_per_provider() {
    let stack = stack(
        MockChatProvider::new()
            .with_outcome(status_error(500))
            .with_completion("ok", 1, 1),
        0,
        1,
    );

    stack.handler.handle(request()).await.unwrap();

    assert_eq!(stack.breakers.breaker_for("o").state(), CircuitState::Open);
    assert_eq!(
        stack.breakers.breaker_for("g").state(),
        CircuitState::Closed
    );
    assert_eq!(
        stack.breakers.breaker_for("a").state(),
        CircuitState::Closed
    );
}

#[tokio::test]
async fn every_provider_dark_surfaces_all_providers_failed() {
    let mut mock = MockChatProvider::new();
    for _ in 0..3 {
        mock = mock.with_outcome(status_error(502));
    }
    let stack = stack(mock, 0, 10);

    let result = stack.handler.handle(request()).await;

    match result {
        Err(GatewayError::AllProvidersFailed { attempted }) => {
            assert_eq!(attempted.len(), 3);
        }
        other => panic!("expected AllProvidersFailed, got {other:?}"),
    }
    assert!(stack.sink.0.lock().unwrap().is_empty());
}

#[tokio::test]
async fn terminal_upstream_status_stops_the_whole_pipeline() {
    let stack = stack(
        MockChatProvider::new()
            .with_outcome(status_error(401))
            .with_completion("never used", 1, 1),
        2,
        10,
    );

    let result = stack.handler.handle(request()).await;

    assert!(matches!(
        result,
        Err(GatewayError::UpstreamTerminal { code: 401, .. })
    ));
    // No retry, no fallback: exactly one upstream call.
    assert_eq!(stack.mock.unary_calls().len(), 1);
}
