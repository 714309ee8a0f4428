//! Usage reporting port.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::StoreError;

/// Aggregate usage over all persisted request logs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UsageSummary {
    /// Number of logged requests.
    pub total_requests: u64,
    /// Total tokens consumed (input + output).
    pub total_tokens: u64,
    /// Total estimated cost in USD.
    pub total_cost_usd: Decimal,
    /// Breakdown by provider.
    pub by_provider: Vec<ProviderUsage>,
}

/// Usage breakdown for one provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderUsage {
    /// Provider name.
    pub provider: String,
    /// Requests served by this provider.
    pub requests: u64,
    /// Tokens consumed with this provider.
    pub tokens: u64,
    /// Estimated cost in USD for this provider.
    pub cost_usd: Decimal,
}

/// Port for reading aggregate usage from the log store.
#[async_trait]
pub trait UsageReader: Send + Sync {
    /// Summarizes all persisted request logs.
    async fn summary(&self) -> Result<UsageSummary, StoreError>;
}
