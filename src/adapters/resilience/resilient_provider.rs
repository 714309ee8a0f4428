//! Resilient provider decorator - retry and circuit breaking over the port.
//!
//! Wraps any `ChatProvider` with same-model retries (model switching is the
//! attempt loop's concern) and the per-provider circuit breaker. Both the
//! unary call and the stream *open* are protected; failures arriving after
//! a stream opened do not feed the breaker.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::ports::{
    ChatProvider, ChunkStream, Completion, ProviderError, ProviderRequest,
};

use super::{CircuitBreaker, CircuitBreakerRegistry};

/// Retry behavior for transient single-attempt failures.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Retries in addition to the initial call.
    pub max_retries: u32,
    /// Base backoff; retry `k` sleeps `base * 2^(k-1)` plus jitter.
    pub base_delay: Duration,
    /// Upper bound of the uniform jitter added to every backoff.
    pub max_jitter: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            base_delay: Duration::from_millis(500),
            max_jitter: Duration::from_millis(250),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1));
        let jitter = self.max_jitter.mul_f64(rand::random::<f64>());
        exponential + jitter
    }
}

/// Decorator implementing `ChatProvider` with resilience applied.
pub struct ResilientProvider<P> {
    inner: P,
    breakers: Arc<CircuitBreakerRegistry>,
    retry: RetryPolicy,
}

impl<P: ChatProvider> ResilientProvider<P> {
    /// Wraps a provider with the default retry policy.
    pub fn new(inner: P, breakers: Arc<CircuitBreakerRegistry>) -> Self {
        Self {
            inner,
            breakers,
            retry: RetryPolicy::default(),
        }
    }

    /// Overrides the retry policy.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    fn breaker(&self, request: &ProviderRequest) -> (Arc<CircuitBreaker>, String) {
        let provider = request.model.provider().to_string();
        (self.breakers.breaker_for(&provider), provider)
    }

    async fn guarded<T, F, Fut>(
        breaker: &CircuitBreaker,
        provider: &str,
        call: F,
    ) -> Result<T, ProviderError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T, ProviderError>>,
    {
        if !breaker.try_acquire() {
            return Err(ProviderError::CircuitOpen {
                provider: provider.to_string(),
            });
        }
        match call().await {
            Ok(value) => {
                breaker.record_success();
                Ok(value)
            }
            Err(ProviderError::Cancelled) => {
                // Caller abandonment says nothing about provider health.
                breaker.release();
                Err(ProviderError::Cancelled)
            }
            Err(error) => {
                breaker.record_failure();
                Err(error)
            }
        }
    }
}

#[async_trait]
impl<P: ChatProvider> ChatProvider for ResilientProvider<P> {
    async fn complete(&self, request: ProviderRequest) -> Result<Completion, ProviderError> {
        let (breaker, provider) = self.breaker(&request);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = Self::guarded(&breaker, &provider, || {
                self.inner.complete(request.clone())
            })
            .await;

            match result {
                Ok(completion) => return Ok(completion),
                Err(error) if error.is_transient() && attempt <= self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        provider = %provider,
                        model = %request.model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient provider failure, retrying"
                    );
                    sleep(delay).await;
                }
                Err(error) => {
                    debug!(provider = %provider, error = %error, "provider call failed");
                    return Err(error);
                }
            }
        }
    }

    async fn complete_stream(
        &self,
        request: ProviderRequest,
    ) -> Result<ChunkStream, ProviderError> {
        let (breaker, provider) = self.breaker(&request);
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let result = Self::guarded(&breaker, &provider, || {
                self.inner.complete_stream(request.clone())
            })
            .await;

            match result {
                Ok(stream) => return Ok(stream),
                Err(error) if error.is_transient() && attempt <= self.retry.max_retries => {
                    let delay = self.retry.backoff(attempt);
                    warn!(
                        provider = %provider,
                        model = %request.model,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "transient stream-open failure, retrying"
                    );
                    sleep(delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }
}
