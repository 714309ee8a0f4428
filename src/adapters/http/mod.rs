//! HTTP adapters - the inbound REST surface.

pub mod chat;
pub mod health;
pub mod middleware;
pub mod problem;
pub mod usage;

use std::time::Duration;

use axum::Router;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use self::chat::ChatAppState;
use self::health::HealthState;
use self::usage::UsageState;

/// Assembles the full application router with shared layers.
pub fn app(
    chat_state: ChatAppState,
    health_state: HealthState,
    usage_state: UsageState,
    request_timeout: Duration,
) -> Router {
    Router::new()
        .merge(chat::chat_router(chat_state))
        .merge(health::health_router(health_state))
        .merge(usage::usage_router(usage_state))
        .layer(
            ServiceBuilder::new()
                .layer(axum::middleware::from_fn(
                    middleware::correlation_id_middleware,
                ))
                .layer(TraceLayer::new_for_http())
                .layer(TimeoutLayer::new(request_timeout))
                .layer(CorsLayer::permissive()),
        )
}
