//! Initial model selection.

use crate::domain::foundation::{GatewayError, ModelId, TokenCount};

/// Routing constants: the three designated models and the context limits.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    /// Model used when no other rule applies.
    pub default_model: ModelId,
    /// Model used for prompts above the standard context limit.
    pub large_context_model: ModelId,
    /// Middle-ground model, reachable only through the fallback chain.
    pub balanced_model: ModelId,
    /// Prompts estimated above this many tokens route to the large-context model.
    pub standard_context_limit: u32,
    /// Prompts estimated above this many tokens are rejected outright.
    pub large_context_limit: u32,
}

/// Picks the initial model for a request.
///
/// Rules, in order: reject prompts above the global ceiling; honor an
/// explicit user model; route big prompts to the large-context model;
/// otherwise use the default.
#[derive(Debug, Clone)]
pub struct Router {
    table: RoutingTable,
}

impl Router {
    /// Creates a router over the given routing table.
    pub fn new(table: RoutingTable) -> Self {
        Self { table }
    }

    /// Returns the routing table this router was built from.
    pub fn table(&self) -> &RoutingTable {
        &self.table
    }

    /// Selects the initial model for an estimated prompt size and an
    /// optional user-requested model.
    pub fn select(
        &self,
        estimated_tokens: TokenCount,
        user_model: Option<&ModelId>,
    ) -> Result<ModelId, GatewayError> {
        if estimated_tokens.exceeds(self.table.large_context_limit) {
            return Err(GatewayError::TokenLimitExceeded {
                estimated: estimated_tokens.as_u32(),
                limit: self.table.large_context_limit,
            });
        }
        // User intent overrides size-based routing.
        if let Some(model) = user_model {
            return Ok(model.clone());
        }
        if estimated_tokens.exceeds(self.table.standard_context_limit) {
            return Ok(self.table.large_context_model.clone());
        }
        Ok(self.table.default_model.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> RoutingTable {
        RoutingTable {
            default_model: ModelId::new("openai/gpt-4o-mini").unwrap(),
            large_context_model: ModelId::new("google/gemini-2.5-pro").unwrap(),
            balanced_model: ModelId::new("anthropic/claude-sonnet-4").unwrap(),
            standard_context_limit: 10_000,
            large_context_limit: 200_000,
        }
    }

    #[test]
    fn small_prompt_routes_to_default() {
        let router = Router::new(table());
        let chosen = router.select(TokenCount::new(500), None).unwrap();
        assert_eq!(chosen.as_str(), "openai/gpt-4o-mini");
    }

    #[test]
    fn large_prompt_routes_to_large_context_model() {
        let router = Router::new(table());
        let chosen = router.select(TokenCount::new(12_500), None).unwrap();
        assert_eq!(chosen.as_str(), "google/gemini-2.5-pro");
    }

    #[test]
    fn boundary_prompt_stays_on_default() {
        let router = Router::new(table());
        let chosen = router.select(TokenCount::new(10_000), None).unwrap();
        assert_eq!(chosen.as_str(), "openai/gpt-4o-mini");
    }

    #[test]
    fn user_model_overrides_size_routing() {
        let router = Router::new(table());
        let wanted = ModelId::new("mistralai/mistral-large").unwrap();
        let chosen = router.select(TokenCount::new(50_000), Some(&wanted)).unwrap();
        assert_eq!(chosen, wanted);
    }

    #[test]
    fn over_ceiling_is_rejected_even_with_user_model() {
        let router = Router::new(table());
        let wanted = ModelId::new("a/x").unwrap();
        let result = router.select(TokenCount::new(200_001), Some(&wanted));
        assert!(matches!(
            result,
            Err(GatewayError::TokenLimitExceeded {
                estimated: 200_001,
                limit: 200_000
            })
        ));
    }

    #[test]
    fn ceiling_boundary_is_inclusive() {
        let router = Router::new(table());
        assert!(router.select(TokenCount::new(200_000), None).is_ok());
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn routing_is_total_below_ceiling(tokens in 0u32..=200_000) {
                let router = Router::new(table());
                let chosen = router.select(TokenCount::new(tokens), None).unwrap();
                let expected = if tokens > 10_000 {
                    "google/gemini-2.5-pro"
                } else {
                    "openai/gpt-4o-mini"
                };
                prop_assert_eq!(chosen.as_str(), expected);
            }

            #[test]
            fn user_model_always_wins_below_ceiling(tokens in 0u32..=200_000) {
                let router = Router::new(table());
                let wanted = ModelId::new("custom/model").unwrap();
                let chosen = router
                    .select(TokenCount::new(tokens), Some(&wanted))
                    .unwrap();
                prop_assert_eq!(chosen, wanted);
            }

            #[test]
            fn above_ceiling_always_rejected(tokens in 200_001u32..=u32::MAX) {
                let router = Router::new(table());
                prop_assert!(router.select(TokenCount::new(tokens), None).is_err());
            }
        }
    }
}
