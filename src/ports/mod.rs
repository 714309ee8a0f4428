//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the orchestration core and the outside world. Adapters implement them.
//!
//! - `ChatProvider` - Upstream chat-completion provider (unary + streaming)
//! - `RequestLogSink` - Persistence of per-request accounting rows
//! - `PricingLookup` - Read-only per-model pricing
//! - `UsageReader` - Aggregate usage reporting over persisted logs

mod chat_provider;
mod pricing_lookup;
mod request_log_sink;
mod usage_reader;

pub use chat_provider::{
    ChatProvider, ChunkStream, ChunkUsage, Completion, ProviderChunk, ProviderError,
    ProviderRequest,
};
pub use pricing_lookup::PricingLookup;
pub use request_log_sink::{RequestLogSink, StoreError};
pub use usage_reader::{ProviderUsage, UsageReader, UsageSummary};
