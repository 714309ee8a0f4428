//! Wire DTOs for the chat endpoints (camelCase JSON).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::chat::{ChatMessage, ChatRequest, ChatResponse, Role, StreamFrame};
use crate::domain::foundation::{GatewayError, ModelId, ValidationError};

/// Inbound body of both chat endpoints.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCompletionRequest {
    #[serde(default)]
    pub messages: Vec<MessageDto>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i64>,
}

/// One inbound conversation message.
#[derive(Debug, Clone, Deserialize)]
pub struct MessageDto {
    pub role: Role,
    pub content: String,
}

impl ChatCompletionRequest {
    /// Converts the wire shape into the validated-on-entry domain request.
    ///
    /// A blank model string means "no preference"; non-positive token
    /// budgets are rejected here because the wire type is wider than the
    /// domain's.
    pub fn into_domain(self) -> Result<ChatRequest, GatewayError> {
        let model = match self.model {
            Some(raw) if !raw.trim().is_empty() => Some(ModelId::new(raw)?),
            _ => None,
        };

        let max_tokens = match self.max_tokens {
            None => None,
            Some(value) if value <= 0 || value > i64::from(u32::MAX) => {
                return Err(GatewayError::Validation(ValidationError::invalid_format(
                    "maxTokens",
                    "must be a positive integer",
                )));
            }
            Some(value) => Some(value as u32),
        };

        Ok(ChatRequest {
            messages: self
                .messages
                .into_iter()
                .map(|m| ChatMessage::new(m.role, m.content))
                .collect(),
            model,
            temperature: self.temperature,
            max_tokens,
        })
    }
}

/// Outbound body of the unary endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatCompletionResponse {
    pub content: String,
    pub model: String,
    pub tokens_used: u32,
    pub estimated_cost_usd: Decimal,
    /// `hh:mm:ss.fff`
    pub response_time: String,
}

impl From<ChatResponse> for ChatCompletionResponse {
    fn from(response: ChatResponse) -> Self {
        Self {
            content: response.content,
            model: response.model.as_str().to_string(),
            tokens_used: response.tokens_used.as_u32(),
            estimated_cost_usd: response.estimated_cost.as_decimal(),
            response_time: format_response_time(response.response_time),
        }
    }
}

/// One SSE frame on the streaming endpoint.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamFrameDto {
    Chunk { content: String },
    Complete { metadata: StreamMetadataDto },
}

/// Aggregate metadata on the terminal frame.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamMetadataDto {
    pub model: String,
    pub total_tokens: u32,
    pub response_time_ms: u64,
    pub avg_tokens_per_second: f64,
    pub estimated_cost_usd: Decimal,
    pub provider: String,
}

impl From<StreamFrame> for StreamFrameDto {
    fn from(frame: StreamFrame) -> Self {
        match frame {
            StreamFrame::Chunk { content } => StreamFrameDto::Chunk { content },
            StreamFrame::Complete { metadata } => StreamFrameDto::Complete {
                metadata: StreamMetadataDto {
                    model: metadata.model.as_str().to_string(),
                    total_tokens: metadata.total_tokens.as_u32(),
                    response_time_ms: metadata.response_time.as_millis() as u64,
                    avg_tokens_per_second: metadata.avg_tokens_per_second,
                    estimated_cost_usd: metadata.estimated_cost.as_decimal(),
                    provider: metadata.provider,
                },
            },
        }
    }
}

/// Formats a duration as `hh:mm:ss.fff`.
fn format_response_time(duration: Duration) -> String {
    let total_ms = duration.as_millis();
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms / 60_000) % 60;
    let seconds = (total_ms / 1_000) % 60;
    let millis = total_ms % 1_000;
    format!("{hours:02}:{minutes:02}:{seconds:02}.{millis:03}")
}
