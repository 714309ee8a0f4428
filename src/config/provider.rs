//! Upstream provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Upstream provider configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderConfig {
    /// API key for the upstream provider
    pub api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Health probe timeout in seconds
    #[serde(default = "default_health_check_timeout")]
    pub health_check_timeout_secs: u64,

    /// Same-model retries inside the resilience layer.
    ///
    /// Independent of the attempt loop's model budget; worst case a single
    /// request issues `(1 + max_retries) * max_attempts` upstream calls.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Consecutive failures before a provider's circuit opens
    #[serde(default = "default_failure_threshold")]
    pub circuit_breaker_failure_threshold: u32,

    /// Cooldown before an open circuit admits a probe, in seconds
    #[serde(default = "default_cooldown")]
    pub circuit_breaker_cooldown_secs: u64,

    /// Pooled connections kept per upstream host
    #[serde(default = "default_max_connections")]
    pub max_connections_per_server: usize,

    /// Idle lifetime before a pooled connection is recycled, in minutes
    #[serde(default = "default_connection_lifetime")]
    pub connection_lifetime_minutes: u64,

    /// Whether to allow HTTP/2
    #[serde(default = "default_use_http2")]
    pub use_http2: bool,
}

impl ProviderConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get health probe timeout as Duration
    pub fn health_check_timeout(&self) -> Duration {
        Duration::from_secs(self.health_check_timeout_secs)
    }

    /// Get circuit breaker cooldown as Duration
    pub fn circuit_breaker_cooldown(&self) -> Duration {
        Duration::from_secs(self.circuit_breaker_cooldown_secs)
    }

    /// Get connection lifetime as Duration
    pub fn connection_lifetime(&self) -> Duration {
        Duration::from_secs(self.connection_lifetime_minutes * 60)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Validate provider configuration
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_api_key() {
            return Err(ValidationError::MissingRequired("PROVIDER__API_KEY"));
        }
        if self.timeout_secs == 0 || self.health_check_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }
        if self.max_connections_per_server == 0 {
            return Err(ValidationError::InvalidConnectionPool);
        }
        Ok(())
    }
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            health_check_timeout_secs: default_health_check_timeout(),
            max_retries: default_max_retries(),
            circuit_breaker_failure_threshold: default_failure_threshold(),
            circuit_breaker_cooldown_secs: default_cooldown(),
            max_connections_per_server: default_max_connections(),
            connection_lifetime_minutes: default_connection_lifetime(),
            use_http2: default_use_http2(),
        }
    }
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_health_check_timeout() -> u64 {
    5
}

fn default_max_retries() -> u32 {
    2
}

fn default_failure_threshold() -> u32 {
    3
}

fn default_cooldown() -> u64 {
    30
}

fn default_max_connections() -> usize {
    100
}

fn default_connection_lifetime() -> u64 {
    5
}

fn default_use_http2() -> bool {
    true
}
