//! PostgreSQL pricing store with a small read-through TTL cache.
//!
//! Pricing is read-mostly; the cache keeps hot models off the database on
//! every request. Staleness up to the TTL is acceptable by design.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::domain::foundation::{ModelId, Timestamp};
use crate::domain::pricing::Pricing;
use crate::ports::{PricingLookup, StoreError};

/// Default cache entry lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(60);

#[derive(Clone)]
struct CacheEntry {
    pricing: Option<Pricing>,
    fetched_at: Instant,
}

/// PostgreSQL implementation of `PricingLookup`.
pub struct PostgresPricingStore {
    pool: PgPool,
    ttl: Duration,
    cache: RwLock<HashMap<String, CacheEntry>>,
}

impl PostgresPricingStore {
    /// Creates a new store with the default cache TTL.
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            ttl: DEFAULT_TTL,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Overrides the cache TTL.
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    async fn fetch(&self, model: &ModelId) -> Result<Option<Pricing>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT model_name, input_cost_per_1m_tokens, output_cost_per_1m_tokens,
                   max_context_tokens, updated_at
            FROM model_pricing
            WHERE model_name = $1
            ORDER BY updated_at DESC
            LIMIT 1
            "#,
        )
        .bind(model.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("failed to fetch pricing: {e}")))?;

        match row {
            Some(row) => {
                let model = ModelId::new(row.get::<String, _>("model_name"))
                    .map_err(|e| StoreError::Database(format!("invalid pricing row: {e}")))?;
                let pricing = Pricing::new(
                    model,
                    row.get::<Decimal, _>("input_cost_per_1m_tokens"),
                    row.get::<Decimal, _>("output_cost_per_1m_tokens"),
                    row.get::<i32, _>("max_context_tokens"),
                    Timestamp::from_datetime(row.get("updated_at")),
                )
                .map_err(|e| StoreError::Database(format!("invalid pricing row: {e}")))?;
                Ok(Some(pricing))
            }
            None => Ok(None),
        }
    }
}

#[async_trait]
impl PricingLookup for PostgresPricingStore {
    async fn find_by_model(&self, model: &ModelId) -> Result<Option<Pricing>, StoreError> {
        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(model.as_str()) {
                if entry.fetched_at.elapsed() < self.ttl {
                    return Ok(entry.pricing.clone());
                }
            }
        }

        let pricing = self.fetch(model).await?;
        let mut cache = self.cache.write().await;
        cache.insert(
            model.as_str().to_string(),
            CacheEntry {
                pricing: pricing.clone(),
                fetched_at: Instant::now(),
            },
        );
        Ok(pricing)
    }
}
