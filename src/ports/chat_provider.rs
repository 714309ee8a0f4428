//! Chat provider port - contract for one upstream completion attempt.
//!
//! The orchestration core drives this port for every attempt; the
//! resilience decorator implements it too, so retry and circuit-breaking
//! compose transparently around any concrete adapter.

use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;

use crate::domain::chat::ChatMessage;
use crate::domain::foundation::ModelId;

/// A lazily produced sequence of streaming chunks.
///
/// Finite and not restartable; the final element carries usage where the
/// upstream reports it.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<ProviderChunk, ProviderError>> + Send>>;

/// Port for upstream chat-completion providers.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Single-shot completion against one model.
    async fn complete(&self, request: ProviderRequest) -> Result<Completion, ProviderError>;

    /// Streaming completion against one model.
    ///
    /// Chunks arrive in upstream order; content may be empty on framing
    /// events and is skipped by callers.
    async fn complete_stream(&self, request: ProviderRequest)
        -> Result<ChunkStream, ProviderError>;
}

/// One attempt's worth of request data, already resolved to a model.
#[derive(Debug, Clone)]
pub struct ProviderRequest {
    /// Model to invoke.
    pub model: ModelId,
    /// Full conversation history.
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature.
    pub temperature: f32,
    /// Generation budget.
    pub max_tokens: u32,
}

/// Result of a unary completion.
///
/// Token counts are exact when the upstream reports usage; zero otherwise,
/// in which case the caller estimates from content length and the routing
/// estimate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Generated content.
    pub content: String,
    /// Tokens in the prompt as reported by the upstream.
    pub input_tokens: u32,
    /// Tokens generated as reported by the upstream.
    pub output_tokens: u32,
}

/// One element of a streaming completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderChunk {
    /// New content in this chunk; may be empty on framing events.
    pub content: String,
    /// Usage record, present on the final chunk where available.
    pub usage: Option<ChunkUsage>,
}

impl ProviderChunk {
    /// Creates a content chunk.
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            usage: None,
        }
    }

    /// Creates a terminal chunk carrying the upstream usage record.
    pub fn with_usage(input_tokens: u32, output_tokens: u32) -> Self {
        Self {
            content: String::new(),
            usage: Some(ChunkUsage {
                input_tokens,
                output_tokens,
            }),
        }
    }
}

/// Token usage reported at the end of a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

/// Failures of a single provider invocation, classified by category.
///
/// The core depends only on [`ProviderError::is_transient`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    /// The upstream answered with a non-success HTTP status.
    #[error("upstream returned status {code}: {message}")]
    Status { code: u16, message: String },

    /// Network, socket, DNS, or TLS failure before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// The upstream did not answer within the configured deadline.
    #[error("request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// The circuit breaker refused the call without contacting the upstream.
    #[error("circuit open for provider '{provider}'")]
    CircuitOpen { provider: String },

    /// The upstream answered with a body the adapter could not interpret.
    #[error("failed to parse upstream response: {0}")]
    Parse(String),

    /// The caller abandoned the request.
    #[error("request cancelled by caller")]
    Cancelled,
}

impl ProviderError {
    /// Returns true when the failure may be recovered by retrying or by
    /// switching models.
    ///
    /// Transient: 429 and 5xx statuses, network failures, deadline expiry,
    /// and open circuits (so the attempt loop rolls to the next model).
    /// Terminal: other 4xx (auth and malformed requests are configuration
    /// problems), parse failures, and caller-initiated cancellation.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Status { code, .. } => {
                matches!(code, 429 | 500 | 502 | 503 | 504)
            }
            ProviderError::Network(_)
            | ProviderError::Timeout { .. }
            | ProviderError::CircuitOpen { .. } => true,
            ProviderError::Parse(_) | ProviderError::Cancelled => false,
        }
    }
}
