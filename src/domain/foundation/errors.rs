//! Error types for the domain layer.

use thiserror::Error;

use super::ModelId;

/// Errors that occur during value object construction and request validation.
#[derive(Debug, Clone, Error)]
pub enum ValidationError {
    #[error("Field '{field}' cannot be empty")]
    EmptyField { field: String },

    #[error("Field '{field}' must be between {min} and {max}, got {actual}")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        actual: f64,
    },

    #[error("Field '{field}' has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    /// Creates an empty field validation error.
    pub fn empty_field(field: impl Into<String>) -> Self {
        ValidationError::EmptyField {
            field: field.into(),
        }
    }

    /// Creates an out of range validation error.
    pub fn out_of_range(field: impl Into<String>, min: f64, max: f64, actual: f64) -> Self {
        ValidationError::OutOfRange {
            field: field.into(),
            min,
            max,
            actual,
        }
    }

    /// Creates an invalid format validation error.
    pub fn invalid_format(field: impl Into<String>, reason: impl Into<String>) -> Self {
        ValidationError::InvalidFormat {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

/// Terminal failures surfaced by the orchestration pipeline.
///
/// Transient upstream failures are recovered inside the attempt loop and
/// never appear here; everything in this enum maps to a client-visible
/// status at the transport boundary.
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// The inbound request failed validation.
    #[error("invalid request: {0}")]
    Validation(#[from] ValidationError),

    /// The estimated prompt size exceeds the global context ceiling.
    #[error("estimated {estimated} tokens exceeds the {limit}-token context ceiling")]
    TokenLimitExceeded { estimated: u32, limit: u32 },

    /// A model id could not be resolved against the fallback chain.
    #[error("unknown model '{0}'")]
    ModelUnknown(ModelId),

    /// Every model in the fallback chain was attempted and failed.
    #[error("all providers failed after trying {}", format_attempted(.attempted))]
    AllProvidersFailed { attempted: Vec<ModelId> },

    /// The upstream rejected the request with a non-retryable status.
    #[error("upstream rejected the request with status {code}: {message}")]
    UpstreamTerminal { code: u16, message: String },

    /// The caller abandoned the request; downstream work was dropped.
    #[error("request cancelled by caller")]
    Cancelled,

    /// Unexpected internal failure.
    #[error("internal error: {0}")]
    Internal(String),
}

fn format_attempted(attempted: &[ModelId]) -> String {
    let names: Vec<&str> = attempted.iter().map(ModelId::as_str).collect();
    format!("[{}]", names.join(", "))
}
