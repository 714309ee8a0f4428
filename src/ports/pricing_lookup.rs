//! Pricing lookup port.

use async_trait::async_trait;

use super::StoreError;
use crate::domain::foundation::ModelId;
use crate::domain::pricing::Pricing;

/// Port for reading per-model pricing.
///
/// Pricing is read-mostly; implementations may cache entries with a TTL.
/// A missing row is `Ok(None)` and is billed as zero by the accountant.
#[async_trait]
pub trait PricingLookup: Send + Sync {
    /// Finds the pricing row for a model, if one exists.
    async fn find_by_model(&self, model: &ModelId) -> Result<Option<Pricing>, StoreError>;
}
