//! Resilience layer wrapping the outbound provider call.
//!
//! Composition is retry-outside-of-circuit-breaker: each retry re-checks
//! the breaker, so a retry that trips it sees an open-circuit error on the
//! next pass instead of punching through.

mod circuit_breaker;
mod resilient_provider;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerRegistry, CircuitState,
};
pub use resilient_provider::{ResilientProvider, RetryPolicy};
