//! Aggregate usage reporting endpoint.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::error;

use super::middleware::CorrelationId;
use super::problem::ProblemDetails;
use crate::ports::{UsageReader, UsageSummary};

/// Shared state of the usage endpoint.
#[derive(Clone)]
pub struct UsageState {
    reader: Arc<dyn UsageReader>,
}

impl UsageState {
    /// Creates the state over the usage reader port.
    pub fn new(reader: Arc<dyn UsageReader>) -> Self {
        Self { reader }
    }
}

/// Outbound body of the usage summary endpoint.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageSummaryDto {
    total_requests: u64,
    total_tokens: u64,
    total_cost_usd: Decimal,
    by_provider: Vec<ProviderUsageDto>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProviderUsageDto {
    provider: String,
    requests: u64,
    tokens: u64,
    cost_usd: Decimal,
}

impl From<UsageSummary> for UsageSummaryDto {
    fn from(summary: UsageSummary) -> Self {
        Self {
            total_requests: summary.total_requests,
            total_tokens: summary.total_tokens,
            total_cost_usd: summary.total_cost_usd,
            by_provider: summary
                .by_provider
                .into_iter()
                .map(|p| ProviderUsageDto {
                    provider: p.provider,
                    requests: p.requests,
                    tokens: p.tokens,
                    cost_usd: p.cost_usd,
                })
                .collect(),
        }
    }
}

/// GET /v1/usage/summary - aggregate accounting over all request logs.
async fn usage_summary(
    State(state): State<UsageState>,
    Extension(correlation_id): Extension<CorrelationId>,
) -> Response {
    match state.reader.summary().await {
        Ok(summary) => Json(UsageSummaryDto::from(summary)).into_response(),
        Err(store_error) => {
            error!(error = %store_error, "usage summary query failed");
            ProblemDetails::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                "Usage summary is currently unavailable",
                &correlation_id,
            )
            .into_response()
        }
    }
}

/// Combined router for the usage endpoint.
pub fn usage_router(state: UsageState) -> Router {
    Router::new()
        .route("/v1/usage/summary", get(usage_summary))
        .with_state(state)
}
