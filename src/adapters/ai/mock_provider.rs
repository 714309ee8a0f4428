//! Mock chat provider for testing.
//!
//! Configurable implementation of the `ChatProvider` port, letting tests
//! run the orchestration pipeline without network access.
//!
//! # Features
//!
//! - Scripted outcomes, consumed in order across both operations
//! - Error injection for resilience testing
//! - Simulated latency
//! - Call capture for verification
//!
//! # Example
//!
//! ```ignore
//! let provider = MockChatProvider::new()
//!     .with_completion("Hello!", 10, 5)
//!     .with_stream(vec!["He", "llo"]);
//! ```

use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{
    ChatProvider, ChunkStream, Completion, ProviderChunk, ProviderError, ProviderRequest,
};

/// A scripted outcome for one provider invocation.
#[derive(Debug, Clone)]
pub enum ScriptedOutcome {
    /// Return a successful unary completion.
    Completion {
        content: String,
        input_tokens: u32,
        output_tokens: u32,
    },
    /// Yield this item sequence as a stream.
    Stream(Vec<Result<ProviderChunk, ProviderError>>),
    /// Fail the invocation.
    Error(ProviderError),
}

/// Mock chat provider with scripted outcomes.
#[derive(Debug, Default)]
pub struct MockChatProvider {
    outcomes: Mutex<VecDeque<ScriptedOutcome>>,
    unary_calls: Mutex<Vec<ProviderRequest>>,
    stream_calls: Mutex<Vec<ProviderRequest>>,
    delay: Duration,
}

impl MockChatProvider {
    /// Creates a mock with no scripted outcomes; unscripted calls succeed
    /// with a canned response.
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts a unary completion.
    pub fn with_completion(
        self,
        content: impl Into<String>,
        input_tokens: u32,
        output_tokens: u32,
    ) -> Self {
        self.with_outcome(ScriptedOutcome::Completion {
            content: content.into(),
            input_tokens,
            output_tokens,
        })
    }

    /// Scripts a clean stream that yields each string as one content chunk.
    pub fn with_stream(self, chunks: Vec<&str>) -> Self {
        self.with_outcome(ScriptedOutcome::Stream(
            chunks
                .into_iter()
                .map(|c| Ok(ProviderChunk::content(c)))
                .collect(),
        ))
    }

    /// Scripts a stream with full control over each item.
    pub fn with_stream_items(self, items: Vec<Result<ProviderChunk, ProviderError>>) -> Self {
        self.with_outcome(ScriptedOutcome::Stream(items))
    }

    /// Scripts an arbitrary outcome.
    pub fn with_outcome(self, outcome: ScriptedOutcome) -> Self {
        self.outcomes.lock().unwrap().push_back(outcome);
        self
    }

    /// Adds simulated latency to every invocation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Requests seen by `complete`, in order.
    pub fn unary_calls(&self) -> Vec<ProviderRequest> {
        self.unary_calls.lock().unwrap().clone()
    }

    /// Requests seen by `complete_stream`, in order.
    pub fn stream_calls(&self) -> Vec<ProviderRequest> {
        self.stream_calls.lock().unwrap().clone()
    }

    fn next_outcome(&self) -> Option<ScriptedOutcome> {
        self.outcomes.lock().unwrap().pop_front()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    async fn complete(&self, request: ProviderRequest) -> Result<Completion, ProviderError> {
        self.unary_calls.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_outcome() {
            Some(ScriptedOutcome::Completion {
                content,
                input_tokens,
                output_tokens,
            }) => Ok(Completion {
                content,
                input_tokens,
                output_tokens,
            }),
            Some(ScriptedOutcome::Error(error)) => Err(error),
            // A stream scripted against a unary call collapses to its content.
            Some(ScriptedOutcome::Stream(items)) => {
                let content: String = items
                    .into_iter()
                    .filter_map(|item| item.ok())
                    .map(|chunk| chunk.content)
                    .collect();
                Ok(Completion {
                    content,
                    input_tokens: 0,
                    output_tokens: 0,
                })
            }
            None => Ok(Completion {
                content: "mock response".to_string(),
                input_tokens: 0,
                output_tokens: 0,
            }),
        }
    }

    async fn complete_stream(
        &self,
        request: ProviderRequest,
    ) -> Result<ChunkStream, ProviderError> {
        self.stream_calls.lock().unwrap().push(request);
        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_outcome() {
            Some(ScriptedOutcome::Stream(items)) => Ok(Box::pin(stream::iter(items))),
            Some(ScriptedOutcome::Error(error)) => Err(error),
            // A unary completion scripted against a stream call becomes a
            // single-chunk stream.
            Some(ScriptedOutcome::Completion { content, .. }) => {
                Ok(Box::pin(stream::iter(vec![Ok(ProviderChunk::content(
                    content,
                ))])))
            }
            None => Ok(Box::pin(stream::iter(vec![Ok(ProviderChunk::content(
                "mock response",
            ))]))),
        }
    }
}
