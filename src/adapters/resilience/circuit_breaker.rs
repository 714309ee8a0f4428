//! Per-provider circuit breaker.
//!
//! ## States
//!
//! - **Closed**: normal operation; consecutive failures are counted
//! - **Open**: calls rejected immediately until the cooldown elapses
//! - **Half-Open**: exactly one probe call admitted; success closes the
//!   circuit, failure reopens it with a fresh cooldown
//!
//! ## Transitions
//!
//! ```text
//! Closed --[failure_threshold consecutive failures]--> Open
//! Open --[cooldown elapsed]--> Half-Open
//! Half-Open --[probe success]--> Closed
//! Half-Open --[probe failure]--> Open
//! ```
//!
//! State is process-wide per provider and shared by all concurrent
//! requests; every transition happens under the breaker's own lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Normal operation - requests flow through.
    Closed,
    /// Too many failures - requests rejected without calling the upstream.
    Open,
    /// Testing recovery - one probe request allowed through.
    HalfOpen,
}

/// Configuration for circuit breaker behavior.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// Time to wait before admitting a probe.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 3,
            cooldown: Duration::from_secs(30),
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Admission gate for one upstream provider.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    /// Creates a closed breaker.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    /// Current state, with the Open-to-Half-Open transition applied lazily.
    pub fn state(&self) -> CircuitState {
        let inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Open if self.cooldown_elapsed(&inner) => CircuitState::HalfOpen,
            state => state,
        }
    }

    /// Requests admission for one call.
    ///
    /// Returns false while the circuit is open or a probe is already in
    /// flight. A true return from an open-but-cooled circuit claims the
    /// single Half-Open probe slot; the caller must follow up with
    /// [`record_success`], [`record_failure`], or [`release`].
    ///
    /// [`record_success`]: Self::record_success
    /// [`record_failure`]: Self::record_failure
    /// [`release`]: Self::release
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.cooldown_elapsed(&inner) {
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Records a successful call: closes a half-open circuit and resets
    /// the failure counter.
    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Closed;
                inner.consecutive_failures = 0;
                inner.opened_at = None;
                inner.probe_in_flight = false;
            }
            CircuitState::Closed => inner.consecutive_failures = 0,
            CircuitState::Open => {}
        }
    }

    /// Records a failed call: counts toward the threshold when closed,
    /// reopens immediately when half-open.
    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        match inner.state {
            CircuitState::Closed => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            CircuitState::HalfOpen => {
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
                inner.probe_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    /// Releases an admission without recording an outcome, e.g. when the
    /// caller cancelled before the upstream answered.
    pub fn release(&self) {
        let mut inner = self.inner.lock().unwrap();
        if inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }

    fn cooldown_elapsed(&self, inner: &BreakerInner) -> bool {
        inner
            .opened_at
            .map_or(false, |at| at.elapsed() >= self.config.cooldown)
    }
}

/// Process-wide registry of breakers, one per provider name.
#[derive(Debug, Default)]
pub struct CircuitBreakerRegistry {
    config: CircuitBreakerConfig,
    breakers: Mutex<HashMap<String, Arc<CircuitBreaker>>>,
}

impl CircuitBreakerRegistry {
    /// Creates a registry; every breaker shares the same configuration.
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            breakers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the breaker for a provider, creating it on first use.
    pub fn breaker_for(&self, provider: &str) -> Arc<CircuitBreaker> {
        let mut breakers = self.breakers.lock().unwrap();
        breakers
            .entry(provider.to_string())
            .or_insert_with(|| Arc::new(CircuitBreaker::new(self.config.clone())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(threshold: u32, cooldown: Duration) -> CircuitBreaker {
        CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: threshold,
            cooldown,
        })
    }

    #[test]
    fn opens_after_threshold_consecutive_failures() {
        let breaker = breaker(3, Duration::from_secs(30));
        for _ in 0..2 {
            assert!(breaker.try_acquire());
            breaker.record_failure();
            assert_eq!(breaker.state(), CircuitState::Closed);
        }
        assert!(breaker.try_acquire());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn success_resets_the_failure_count() {
        let breaker = breaker(3, Duration::from_secs(30));
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn cooldown_admits_exactly_one_probe() {
        let breaker = breaker(1, Duration::ZERO);
        breaker.record_failure();
        // Cooldown of zero: immediately half-open.
        assert!(breaker.try_acquire());
        // Probe slot is taken.
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn probe_success_closes_the_circuit() {
        let breaker = breaker(1, Duration::ZERO);
        breaker.record_failure();
        assert!(breaker.try_acquire());
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire());
    }

    #[test]
    fn probe_failure_reopens_with_fresh_cooldown() {
        let breaker = breaker(1, Duration::from_secs(30));
        breaker.record_failure();
        // Force the half-open transition by treating the circuit as cooled.
        {
            let mut inner = breaker.inner.lock().unwrap();
            inner.state = CircuitState::HalfOpen;
            inner.probe_in_flight = false;
        }
        assert!(breaker.try_acquire());
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
        assert!(!breaker.try_acquire());
    }

    #[test]
    fn release_frees_the_probe_slot() {
        let breaker = breaker(1, Duration::ZERO);
        breaker.record_failure();
        assert!(breaker.try_acquire());
        breaker.release();
        assert!(breaker.try_acquire());
    }

    #[test]
    fn registry_shares_breakers_per_provider() {
        let registry = CircuitBreakerRegistry::new(CircuitBreakerConfig {
            failure_threshold: 1,
            cooldown: Duration::from_secs(30),
        });
        let a = registry.breaker_for("openai");
        let b = registry.breaker_for("openai");
        let other = registry.breaker_for("anthropic");

        a.record_failure();
        assert_eq!(b.state(), CircuitState::Open);
        assert_eq!(other.state(), CircuitState::Closed);
    }
}
