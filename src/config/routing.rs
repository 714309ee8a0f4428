//! Model routing configuration

use serde::Deserialize;

use super::error::ValidationError;
use crate::domain::foundation::ModelId;
use crate::domain::routing::{FallbackChain, RoutingTable};

/// Model routing configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RoutingConfig {
    /// Model used when no other rule applies
    #[serde(default = "default_default_model")]
    pub default_model: String,

    /// Model used for prompts above the standard context limit
    #[serde(default = "default_large_context_model")]
    pub large_context_model: String,

    /// Middle-ground model in the fallback chain
    #[serde(default = "default_balanced_model")]
    pub balanced_model: String,

    /// Prompts above this estimate route to the large-context model
    #[serde(default = "default_standard_context_limit")]
    pub standard_context_limit: u32,

    /// Prompts above this estimate are rejected outright
    #[serde(default = "default_large_context_limit")]
    pub large_context_limit: u32,
}

impl RoutingConfig {
    /// Validate routing configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.default_model.trim().is_empty() {
            return Err(ValidationError::EmptyModelId("default_model"));
        }
        if self.large_context_model.trim().is_empty() {
            return Err(ValidationError::EmptyModelId("large_context_model"));
        }
        if self.balanced_model.trim().is_empty() {
            return Err(ValidationError::EmptyModelId("balanced_model"));
        }
        if self.default_model == self.large_context_model
            || self.default_model == self.balanced_model
            || self.large_context_model == self.balanced_model
        {
            return Err(ValidationError::DuplicateRoutingModels);
        }
        if self.standard_context_limit >= self.large_context_limit {
            return Err(ValidationError::InvalidContextLimits);
        }
        Ok(())
    }

    /// Build the routing table for the router
    pub fn table(&self) -> Result<RoutingTable, ValidationError> {
        Ok(RoutingTable {
            default_model: self.model_id(&self.default_model, "default_model")?,
            large_context_model: self.model_id(&self.large_context_model, "large_context_model")?,
            balanced_model: self.model_id(&self.balanced_model, "balanced_model")?,
            standard_context_limit: self.standard_context_limit,
            large_context_limit: self.large_context_limit,
        })
    }

    /// Build the fallback chain: large-context, then balanced, then default
    pub fn fallback_chain(&self) -> Result<FallbackChain, ValidationError> {
        let chain = vec![
            self.model_id(&self.large_context_model, "large_context_model")?,
            self.model_id(&self.balanced_model, "balanced_model")?,
            self.model_id(&self.default_model, "default_model")?,
        ];
        FallbackChain::new(chain)
            .map_err(|_| ValidationError::EmptyModelId("fallback_chain"))
    }

    fn model_id(&self, raw: &str, field: &'static str) -> Result<ModelId, ValidationError> {
        ModelId::new(raw).map_err(|_| ValidationError::EmptyModelId(field))
    }
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            default_model: default_default_model(),
            large_context_model: default_large_context_model(),
            balanced_model: default_balanced_model(),
            standard_context_limit: default_standard_context_limit(),
            large_context_limit: default_large_context_limit(),
        }
    }
}

fn default_default_model() -> String {
    "openai/gpt-4o-mini".to_string()
}

fn default_large_context_model() -> String {
    "google/gemini-2.5-pro".to_string()
}

fn default_balanced_model() -> String {
    "anthropic/claude-sonnet-4".to_string()
}

fn default_standard_context_limit() -> u32 {
    10_000
}

fn default_large_context_limit() -> u32 {
    200_000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = RoutingConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.standard_context_limit, 10_000);
        assert_eq!(config.large_context_limit, 200_000);
    }

    #[test]
    fn test_rejects_duplicate_models() {
        let config = RoutingConfig {
            balanced_model: default_default_model(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ValidationError::DuplicateRoutingModels)
        ));
    }

    #[test]
    fn test_rejects_inverted_limits() {
        let config = RoutingConfig {
            standard_context_limit: 300_000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fallback_chain_ordering() {
        let config = RoutingConfig::default();
        let chain = config.fallback_chain().unwrap();
        let models: Vec<&str> = chain.models().iter().map(ModelId::as_str).collect();
        assert_eq!(
            models,
            vec![
                "google/gemini-2.5-pro",
                "anthropic/claude-sonnet-4",
                "openai/gpt-4o-mini"
            ]
        );
    }
}
