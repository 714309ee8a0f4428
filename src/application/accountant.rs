//! Accountant - cost derivation and request log persistence.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::domain::foundation::{CostAmount, ModelId, TokenCount};
use crate::domain::request_log::RequestLog;
use crate::ports::{PricingLookup, RequestLogSink};

/// Records accounting data for one successful request.
///
/// Accounting is strictly best-effort: a pricing or persistence failure is
/// logged and swallowed, never surfaced, so it cannot turn a successful
/// chat response into a client-visible error.
pub struct Accountant {
    pricing: Arc<dyn PricingLookup>,
    sink: Arc<dyn RequestLogSink>,
}

impl Accountant {
    /// Creates an accountant over the pricing and log-sink ports.
    pub fn new(pricing: Arc<dyn PricingLookup>, sink: Arc<dyn RequestLogSink>) -> Self {
        Self { pricing, sink }
    }

    /// Derives the request cost, persists a log row, and returns the cost.
    ///
    /// Returns [`CostAmount::ZERO`] when no pricing row exists for the
    /// model or when any accounting step fails.
    pub async fn track(
        &self,
        model: &ModelId,
        input_tokens: TokenCount,
        output_tokens: TokenCount,
        response_time: Duration,
        was_fallback: bool,
    ) -> CostAmount {
        let cost = match self.pricing.find_by_model(model).await {
            Ok(Some(pricing)) => pricing.cost(input_tokens, output_tokens),
            Ok(None) => {
                debug!(model = %model, "no pricing row for model, billing zero");
                CostAmount::ZERO
            }
            Err(error) => {
                warn!(model = %model, error = %error, "pricing lookup failed, billing zero");
                CostAmount::ZERO
            }
        };

        let log = RequestLog::record(
            model.clone(),
            input_tokens,
            output_tokens,
            cost,
            response_time,
            was_fallback,
        );

        if let Err(error) = self.sink.save(&log).await {
            warn!(
                model = %model,
                log_id = %log.id(),
                error = %error,
                "failed to persist request log"
            );
            return CostAmount::ZERO;
        }

        cost
    }
}
