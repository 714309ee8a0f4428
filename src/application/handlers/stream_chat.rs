//! Streaming chat-completion pipeline.
//!
//! Forwards upstream content chunks to the caller as they arrive through a
//! bounded channel (backpressure follows the consumer), then emits exactly
//! one terminal frame with aggregate metadata after accounting.
//!
//! Output tokens on this path are estimated as the number of emitted
//! chunks; usage records reported by the upstream stream are deliberately
//! ignored so unary and streaming accounting stay independently simple.

use std::sync::Arc;
use std::time::Instant;

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::application::{Accountant, AttemptLoop, MAX_ATTEMPTS};
use crate::domain::chat::{ChatRequest, StreamFrame, StreamMetadata};
use crate::domain::foundation::{GatewayError, ModelId, TokenCount};
use crate::domain::routing::{FallbackChain, Router};
use crate::ports::ChatProvider;

/// Frames buffered between the producer and the response writer.
const FRAME_BUFFER: usize = 32;

/// Orchestrates one streaming request: validate, route, stream with
/// pre-chunk fallback, account, emit the terminal frame.
pub struct StreamChatHandler {
    router: Router,
    provider: Arc<dyn ChatProvider>,
    fallback: FallbackChain,
    accountant: Arc<Accountant>,
    max_attempts: u32,
}

impl StreamChatHandler {
    /// Creates the handler from its collaborators.
    pub fn new(
        router: Router,
        provider: Arc<dyn ChatProvider>,
        fallback: FallbackChain,
        accountant: Arc<Accountant>,
    ) -> Self {
        Self {
            router,
            provider,
            fallback,
            accountant,
            max_attempts: MAX_ATTEMPTS,
        }
    }

    /// Overrides the attempt budget.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Validates and routes the request, then hands the stream production
    /// to a background task. Validation and routing failures surface here,
    /// before any frame is emitted; later failures close the stream without
    /// a terminal frame.
    pub async fn handle(
        &self,
        request: ChatRequest,
    ) -> Result<ReceiverStream<StreamFrame>, GatewayError> {
        request.validate()?;

        let estimate = request.estimated_tokens();
        let initial_model = self.router.select(estimate, request.model.as_ref())?;
        let started = Instant::now();

        let (tx, rx) = mpsc::channel(FRAME_BUFFER);
        let producer = StreamProducer {
            provider: self.provider.clone(),
            fallback: self.fallback.clone(),
            accountant: self.accountant.clone(),
            max_attempts: self.max_attempts,
        };
        tokio::spawn(async move {
            producer.run(request, initial_model, estimate, started, tx).await;
        });

        Ok(ReceiverStream::new(rx))
    }
}

/// Background task producing frames for one streaming request.
struct StreamProducer {
    provider: Arc<dyn ChatProvider>,
    fallback: FallbackChain,
    accountant: Arc<Accountant>,
    max_attempts: u32,
}

impl StreamProducer {
    async fn run(
        self,
        request: ChatRequest,
        initial_model: ModelId,
        input_estimate: TokenCount,
        started: Instant,
        tx: mpsc::Sender<StreamFrame>,
    ) {
        let mut current = initial_model;
        let mut attempted: Vec<ModelId> = Vec::new();
        let mut attempts = 0u32;
        let mut chunk_count = 0u32;

        'attempts: loop {
            attempted.push(current.clone());
            attempts += 1;
            debug!(model = %current, attempt = attempts, "opening upstream stream");

            let provider_request = AttemptLoop::provider_request(&request, &current);
            let mut stream = match self.provider.complete_stream(provider_request).await {
                Ok(stream) => stream,
                Err(error) if error.is_transient() && attempts < self.max_attempts => {
                    warn!(model = %current, error = %error, "stream open failed, falling back");
                    match self.fallback.next(&current, &attempted) {
                        Ok(next) => {
                            current = next;
                            continue 'attempts;
                        }
                        Err(chain_error) => {
                            warn!(error = %chain_error, "fallback chain exhausted during stream open");
                            return;
                        }
                    }
                }
                Err(error) => {
                    warn!(model = %current, error = %error, "stream open failed terminally");
                    return;
                }
            };

            while let Some(item) = stream.next().await {
                match item {
                    Ok(chunk) => {
                        if chunk.content.is_empty() {
                            continue;
                        }
                        chunk_count += 1;
                        let frame = StreamFrame::Chunk {
                            content: chunk.content,
                        };
                        if tx.send(frame).await.is_err() {
                            // Caller hung up: abandon silently, nothing billed.
                            debug!(model = %current, "stream consumer dropped, abandoning");
                            return;
                        }
                    }
                    Err(error)
                        if chunk_count == 0
                            && error.is_transient()
                            && attempts < self.max_attempts =>
                    {
                        warn!(model = %current, error = %error, "stream failed before first chunk, falling back");
                        match self.fallback.next(&current, &attempted) {
                            Ok(next) => {
                                current = next;
                                continue 'attempts;
                            }
                            Err(chain_error) => {
                                warn!(error = %chain_error, "fallback chain exhausted mid-open");
                                return;
                            }
                        }
                    }
                    Err(error) => {
                        // The caller already holds content bound to this
                        // model; close the stream without a terminal frame.
                        warn!(
                            model = %current,
                            chunks = chunk_count,
                            error = %error,
                            "stream failed mid-flight, closing without completion"
                        );
                        return;
                    }
                }
            }
            break;
        }

        let response_time = started.elapsed();
        let output_tokens = TokenCount::new(chunk_count);
        let estimated_cost = self
            .accountant
            .track(
                &current,
                input_estimate,
                output_tokens,
                response_time,
                attempts > 1,
            )
            .await;

        let elapsed_ms = response_time.as_millis().max(1) as u64;
        let metadata = StreamMetadata {
            model: current.clone(),
            total_tokens: output_tokens,
            response_time,
            avg_tokens_per_second: f64::from(chunk_count) * 1000.0 / elapsed_ms as f64,
            estimated_cost,
            provider: current.provider().to_string(),
        };

        info!(
            model = %current,
            attempts,
            chunks = chunk_count,
            elapsed_ms,
            "chat stream served"
        );
        let _ = tx.send(StreamFrame::Complete { metadata }).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    use crate::adapters::ai::{MockChatProvider, ScriptedOutcome};
    use crate::domain::chat::ChatMessage;
    use crate::domain::pricing::Pricing;
    use crate::domain::request_log::RequestLog;
    use crate::domain::routing::RoutingTable;
    use crate::ports::{PricingLookup, ProviderChunk, ProviderError, RequestLogSink, StoreError};

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

    fn table() -> RoutingTable {
        RoutingTable {
            default_model: model("o/default"),
            large_context_model: model("g/large"),
            balanced_model: model("a/balanced"),
            standard_context_limit: 10_000,
            large_context_limit: 200_000,
        }
    }

    fn chain() -> FallbackChain {
        FallbackChain::new(vec![model("g/large"), model("a/balanced"), model("o/default")])
            .unwrap()
    }

    fn handler(provider: Arc<MockChatProvider>) -> (StreamChatHandler, Arc<InMemorySink>) {
        let sink = Arc::new(InMemorySink::default());
        let accountant = Arc::new(Accountant::new(Arc::new(NoPricing), sink.clone()));
        let handler = StreamChatHandler::new(
            Router::new(table()),
            provider,
            chain(),
            accountant,
        );
        (handler, sink)
    }

    async fn collect(stream: ReceiverStream<StreamFrame>) -> Vec<StreamFrame> {
        stream.collect().await
    }

    #[tokio::test]
    async fn forwards_chunks_in_order_then_completes() {
        let provider = Arc::new(MockChatProvider::new().with_stream(vec!["he", "llo"]));
        let (handler, sink) = handler(provider);

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let frames = collect(handler.handle(request).await.unwrap()).await;

        assert_eq!(frames.len(), 3);
        assert_eq!(
            frames[0],
            StreamFrame::Chunk {
                content: "he".into()
            }
        );
        assert_eq!(
            frames[1],
            StreamFrame::Chunk {
                content: "llo".into()
            }
        );
        match &frames[2] {
            StreamFrame::Complete { metadata } => {
                assert_eq!(metadata.total_tokens.as_u32(), 2);
                assert_eq!(metadata.model, model("o/default"));
                assert_eq!(metadata.provider, "o");
            }
            other => panic!("expected Complete, got {other:?}"),
        }

        let logs = sink.0.lock().unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].output_tokens().as_u32(), 2);
        assert!(!logs[0].was_fallback());
    }

    #[tokio::test]
    async fn empty_content_chunks_are_skipped_and_unbilled() {
        let provider = Arc::new(MockChatProvider::new().with_stream_items(vec![
            Ok(ProviderChunk::content("")),
            Ok(ProviderChunk::content("data")),
            Ok(ProviderChunk::with_usage(50, 75)),
        ]));
        let (handler, sink) = handler(provider);

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let frames = collect(handler.handle(request).await.unwrap()).await;

        // One content frame plus the terminal frame; upstream usage ignored.
        assert_eq!(frames.len(), 2);
        assert_eq!(sink.0.lock().unwrap()[0].output_tokens().as_u32(), 1);
    }

    #[tokio::test]
    async fn open_failure_falls_back_before_first_chunk() {
        let provider = Arc::new(
            MockChatProvider::new()
                .with_outcome(ScriptedOutcome::Error(ProviderError::Status {
                    code: 503,
                    message: "down".into(),
                }))
                .with_stream(vec!["ok"]),
        );
        let (handler, sink) = handler(provider.clone());

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let frames = collect(handler.handle(request).await.unwrap()).await;

        assert_eq!(frames.len(), 2);
        match &frames[1] {
            StreamFrame::Complete { metadata } => {
                assert_eq!(metadata.model, model("g/large"));
            }
            other => panic!("expected Complete, got {other:?}"),
        }
        assert!(sink.0.lock().unwrap()[0].was_fallback());
        assert_eq!(provider.stream_calls().len(), 2);
    }

    #[tokio::test]
    async fn mid_stream_failure_closes_without_completion() {
        let provider = Arc::new(MockChatProvider::new().with_stream_items(vec![
            Ok(ProviderChunk::content("partial")),
            Err(ProviderError::Network("connection reset".into())),
        ]));
        let (handler, sink) = handler(provider.clone());

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let frames = collect(handler.handle(request).await.unwrap()).await;

        // Partial content was delivered but no terminal frame follows,
        // and nothing is billed.
        assert_eq!(frames.len(), 1);
        assert!(matches!(frames[0], StreamFrame::Chunk { .. }));
        assert!(sink.0.lock().unwrap().is_empty());
        // No fallback after content was emitted.
        assert_eq!(provider.stream_calls().len(), 1);
    }

    #[tokio::test]
    async fn item_error_before_first_chunk_falls_back() {
        let provider = Arc::new(
            MockChatProvider::new()
                .with_stream_items(vec![Err(ProviderError::Status {
                    code: 429,
                    message: "slow down".into(),
                })])
                .with_stream(vec!["recovered"]),
        );
        let (handler, _sink) = handler(provider.clone());

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let frames = collect(handler.handle(request).await.unwrap()).await;

        assert_eq!(frames.len(), 2);
        assert_eq!(
            frames[0],
            StreamFrame::Chunk {
                content: "recovered".into()
            }
        );
        assert_eq!(provider.stream_calls().len(), 2);
    }

    #[tokio::test]
    async fn validation_failure_surfaces_before_streaming() {
        let provider = Arc::new(MockChatProvider::new().with_stream(vec!["unused"]));
        let (handler, _sink) = handler(provider.clone());

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]).with_temperature(3.0);
        let result = handler.handle(request).await;

        assert!(matches!(result, Err(GatewayError::Validation(_))));
        assert!(provider.stream_calls().is_empty());
    }

    #[tokio::test]
    async fn dropped_consumer_abandons_without_billing() {
        let provider = Arc::new(MockChatProvider::new().with_stream(vec!["a", "b", "c"]));
        let (handler, sink) = handler(provider);

        let request = ChatRequest::new(vec![ChatMessage::user("hi")]);
        let stream = handler.handle(request).await.unwrap();
        drop(stream);

        // Give the producer task time to observe the closed channel.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(sink.0.lock().unwrap().is_empty());
    }
}
