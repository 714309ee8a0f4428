//! Fallback chain over the configured model sequence.

use crate::domain::foundation::{GatewayError, ModelId, ValidationError};

/// Ordered sequence of models to substitute after a transient failure.
///
/// Pure and stateless: `next` scans the chain circularly from the failed
/// model's successor and returns the first model not already attempted.
#[derive(Debug, Clone)]
pub struct FallbackChain {
    chain: Vec<ModelId>,
}

impl FallbackChain {
    /// Creates a fallback chain from an ordered, non-empty model sequence.
    pub fn new(chain: Vec<ModelId>) -> Result<Self, ValidationError> {
        if chain.is_empty() {
            return Err(ValidationError::empty_field("fallback_chain"));
        }
        Ok(Self { chain })
    }

    /// The configured chain, in order.
    pub fn models(&self) -> &[ModelId] {
        &self.chain
    }

    /// Returns the next model to try after `failed_model`, skipping models
    /// already in `attempted`.
    ///
    /// Fails with `ModelUnknown` when the failed model is not part of the
    /// chain, and with `AllProvidersFailed` when every chain member has
    /// been attempted.
    pub fn next(
        &self,
        failed_model: &ModelId,
        attempted: &[ModelId],
    ) -> Result<ModelId, GatewayError> {
        let index = self
            .chain
            .iter()
            .position(|m| m == failed_model)
            .ok_or_else(|| GatewayError::ModelUnknown(failed_model.clone()))?;

        for offset in 1..=self.chain.len() {
            let candidate = &self.chain[(index + offset) % self.chain.len()];
            if !attempted.contains(candidate) {
                return Ok(candidate.clone());
            }
        }
        Err(GatewayError::AllProvidersFailed {
            attempted: attempted.to_vec(),
        })
    }
}
