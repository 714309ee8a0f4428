//! PostgreSQL request log store.
//!
//! Persists accounting rows and serves the aggregate usage summary.

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::{PgPool, Row};

use crate::domain::request_log::RequestLog;
use crate::ports::{ProviderUsage, RequestLogSink, StoreError, UsageReader, UsageSummary};

/// PostgreSQL implementation of `RequestLogSink` and `UsageReader`.
#[derive(Clone)]
pub struct PostgresRequestLogStore {
    pool: PgPool,
}

impl PostgresRequestLogStore {
    /// Creates a new store over the shared pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RequestLogSink for PostgresRequestLogStore {
    async fn save(&self, log: &RequestLog) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO request_logs (
                id, timestamp, model_used, input_tokens, output_tokens,
                estimated_cost_usd, provider_name, response_time_ms, was_fallback
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(log.id())
        .bind(log.timestamp().as_datetime())
        .bind(log.model_used().as_str())
        .bind(log.input_tokens().as_u32() as i32)
        .bind(log.output_tokens().as_u32() as i32)
        .bind(log.estimated_cost().as_decimal())
        .bind(log.provider_name())
        .bind(log.response_time().as_millis() as i64)
        .bind(log.was_fallback())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("failed to insert request log: {e}")))?;

        Ok(())
    }
}

#[async_trait]
impl UsageReader for PostgresRequestLogStore {
    async fn summary(&self) -> Result<UsageSummary, StoreError> {
        let totals = sqlx::query(
            r#"
            SELECT COUNT(*)                                      AS requests,
                   COALESCE(SUM(input_tokens + output_tokens), 0) AS tokens,
                   COALESCE(SUM(estimated_cost_usd), 0)           AS cost
            FROM request_logs
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("failed to aggregate usage: {e}")))?;

        let providers = sqlx::query(
            r#"
            SELECT provider_name,
                   COUNT(*)                                       AS requests,
                   COALESCE(SUM(input_tokens + output_tokens), 0) AS tokens,
                   COALESCE(SUM(estimated_cost_usd), 0)           AS cost
            FROM request_logs
            GROUP BY provider_name
            ORDER BY provider_name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::Database(format!("failed to aggregate provider usage: {e}")))?;

        Ok(UsageSummary {
            total_requests: totals.get::<i64, _>("requests") as u64,
            total_tokens: totals.get::<i64, _>("tokens") as u64,
            total_cost_usd: totals.get::<Decimal, _>("cost"),
            by_provider: providers
                .into_iter()
                .map(|row| ProviderUsage {
                    provider: row.get::<String, _>("provider_name"),
                    requests: row.get::<i64, _>("requests") as u64,
                    tokens: row.get::<i64, _>("tokens") as u64,
                    cost_usd: row.get::<Decimal, _>("cost"),
                })
                .collect(),
        })
    }
}
