//! Request accounting log entity.

use std::time::Duration;
use uuid::Uuid;

use super::foundation::{CostAmount, ModelId, Timestamp, TokenCount};

/// Accounting record for one successfully served request.
///
/// Immutable after construction; the id and timestamp are assigned when the
/// record is created, at the tail of a successful pipeline. Exactly one row
/// is persisted per success.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestLog {
    id: Uuid,
    timestamp: Timestamp,
    model_used: ModelId,
    input_tokens: TokenCount,
    output_tokens: TokenCount,
    estimated_cost: CostAmount,
    provider_name: String,
    response_time: Duration,
    was_fallback: bool,
}

impl RequestLog {
    /// Records a new log entry with a fresh id and the current UTC time.
    pub fn record(
        model_used: ModelId,
        input_tokens: TokenCount,
        output_tokens: TokenCount,
        estimated_cost: CostAmount,
        response_time: Duration,
        was_fallback: bool,
    ) -> Self {
        let provider_name = model_used.provider().to_string();
        Self {
            id: Uuid::new_v4(),
            timestamp: Timestamp::now(),
            model_used,
            input_tokens,
            output_tokens,
            estimated_cost,
            provider_name,
            response_time,
            was_fallback,
        }
    }

    /// Rehydrates a log entry from persisted state.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        timestamp: Timestamp,
        model_used: ModelId,
        input_tokens: TokenCount,
        output_tokens: TokenCount,
        estimated_cost: CostAmount,
        provider_name: String,
        response_time: Duration,
        was_fallback: bool,
    ) -> Self {
        Self {
            id,
            timestamp,
            model_used,
            input_tokens,
            output_tokens,
            estimated_cost,
            provider_name,
            response_time,
            was_fallback,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn timestamp(&self) -> Timestamp {
        self.timestamp
    }

    pub fn model_used(&self) -> &ModelId {
        &self.model_used
    }

    pub fn input_tokens(&self) -> TokenCount {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> TokenCount {
        self.output_tokens
    }

    /// Total tokens consumed (input + output).
    pub fn total_tokens(&self) -> TokenCount {
        self.input_tokens + self.output_tokens
    }

    pub fn estimated_cost(&self) -> CostAmount {
        self.estimated_cost
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    pub fn response_time(&self) -> Duration {
        self.response_time
    }

    /// True iff the success came from any attempt after the first.
    pub fn was_fallback(&self) -> bool {
        self.was_fallback
    }
}
