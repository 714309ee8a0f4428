//! Chat request and response types.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::foundation::{CostAmount, ModelId, TokenCount, ValidationError};

/// Role of the message sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions (guides model behavior).
    System,
    /// User input.
    User,
    /// Assistant (model) response.
    Assistant,
}

/// A single message in the conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Who sent this message.
    pub role: Role,
    /// Message content.
    pub content: String,
}

impl ChatMessage {
    /// Creates a new message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Creates a user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// An inbound chat-completion request, validated before orchestration.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    /// Ordered conversation messages.
    pub messages: Vec<ChatMessage>,
    /// Model explicitly requested by the caller, if any.
    pub model: Option<ModelId>,
    /// Sampling temperature in [0, 2].
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    /// Creates a request with just messages; other fields default to None.
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages,
            model: None,
            temperature: None,
            max_tokens: None,
        }
    }

    /// Sets the requested model.
    pub fn with_model(mut self, model: ModelId) -> Self {
        self.model = Some(model);
        self
    }

    /// Sets the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the generation budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Validates the request against the inbound contract.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.messages.is_empty() {
            return Err(ValidationError::empty_field("messages"));
        }
        for message in &self.messages {
            if message.content.trim().is_empty() {
                return Err(ValidationError::empty_field("messages.content"));
            }
        }
        if let Some(temperature) = self.temperature {
            if !(0.0..=2.0).contains(&temperature) {
                return Err(ValidationError::out_of_range(
                    "temperature",
                    0.0,
                    2.0,
                    f64::from(temperature),
                ));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(ValidationError::invalid_format(
                "maxTokens",
                "must be a positive integer",
            ));
        }
        Ok(())
    }

    /// Estimates prompt size: total characters across all messages, divided
    /// by four. Used for routing only, never for billing.
    pub fn estimated_tokens(&self) -> TokenCount {
        let chars: usize = self
            .messages
            .iter()
            .map(|m| m.content.chars().count())
            .sum();
        TokenCount::new((chars / 4) as u32)
    }
}

/// The completed response returned to the caller on the unary path.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    /// Generated content.
    pub content: String,
    /// Model that produced the response.
    pub model: ModelId,
    /// Total tokens consumed (input + output).
    pub tokens_used: TokenCount,
    /// Estimated cost of the request in USD.
    pub estimated_cost: CostAmount,
    /// Wall-clock time spent serving the request.
    pub response_time: Duration,
}

/// One element emitted on the streaming path.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFrame {
    /// A piece of generated content, forwarded as it arrives.
    Chunk { content: String },
    /// Terminal frame carrying aggregate metadata; exactly one per stream,
    /// always after the last chunk.
    Complete { metadata: StreamMetadata },
}

/// Aggregate metadata emitted once the stream completes.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamMetadata {
    /// Model that produced the stream.
    pub model: ModelId,
    /// Total output tokens (estimated as the number of emitted chunks).
    pub total_tokens: TokenCount,
    /// Wall-clock time from request start to stream end.
    pub response_time: Duration,
    /// Throughput estimate derived from the chunk count.
    pub avg_tokens_per_second: f64,
    /// Estimated cost of the request in USD.
    pub estimated_cost: CostAmount,
    /// Provider component of the model id.
    pub provider: String,
}
