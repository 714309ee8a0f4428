//! Request log sink port.

use async_trait::async_trait;

use crate::domain::request_log::RequestLog;

/// Errors from the persistence adapters.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(String),
}

/// Port for persisting per-request accounting rows.
///
/// Implementations must accept concurrent writes; the core makes no
/// ordering claims across requests.
#[async_trait]
pub trait RequestLogSink: Send + Sync {
    /// Persists one accounting row.
    async fn save(&self, log: &RequestLog) -> Result<(), StoreError>;
}
