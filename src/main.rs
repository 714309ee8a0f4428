//! LLM Gateway server binary.
//!
//! Boots configuration, tracing, the database pool (running migrations),
//! wires the orchestration pipeline, and serves the HTTP surface until a
//! shutdown signal arrives.

use std::sync::Arc;
use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

use llm_gateway::adapters::ai::{OpenRouterConfig, OpenRouterProvider};
use llm_gateway::adapters::http::chat::ChatAppState;
use llm_gateway::adapters::http::health::HealthState;
use llm_gateway::adapters::http::usage::UsageState;
use llm_gateway::adapters::http;
use llm_gateway::adapters::postgres::{PostgresPricingStore, PostgresRequestLogStore};
use llm_gateway::adapters::resilience::{
    CircuitBreakerConfig, CircuitBreakerRegistry, ResilientProvider, RetryPolicy,
};
use llm_gateway::application::handlers::{CompleteChatHandler, StreamChatHandler};
use llm_gateway::application::{Accountant, AttemptLoop};
use llm_gateway::config::AppConfig;
use llm_gateway::domain::routing::Router;
use llm_gateway::ports::ChatProvider;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config);
    config.validate()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("database ready");

    let upstream_config =
        OpenRouterConfig::new(config.provider.api_key.clone().unwrap_or_default())
            .with_base_url(config.provider.base_url.clone())
            .with_timeout(config.provider.timeout())
            .with_max_connections_per_server(config.provider.max_connections_per_server)
            .with_connection_lifetime(config.provider.connection_lifetime())
            .with_http2(config.provider.use_http2);
    let upstream = OpenRouterProvider::new(upstream_config)?;

    let breakers = Arc::new(CircuitBreakerRegistry::new(CircuitBreakerConfig {
        failure_threshold: config.provider.circuit_breaker_failure_threshold,
        cooldown: config.provider.circuit_breaker_cooldown(),
    }));
    let retry = RetryPolicy {
        max_retries: config.provider.max_retries,
        ..RetryPolicy::default()
    };
    let provider: Arc<dyn ChatProvider> =
        Arc::new(ResilientProvider::new(upstream, breakers).with_retry_policy(retry));

    let router = Router::new(config.routing.table()?);
    let fallback = config.routing.fallback_chain()?;

    let log_store = Arc::new(PostgresRequestLogStore::new(pool.clone()));
    let pricing_store = Arc::new(PostgresPricingStore::new(pool.clone()));
    let accountant = Arc::new(Accountant::new(pricing_store, log_store.clone()));

    let complete_handler = Arc::new(CompleteChatHandler::new(
        router.clone(),
        AttemptLoop::new(provider.clone(), fallback.clone()),
        accountant.clone(),
    ));
    let stream_handler = Arc::new(StreamChatHandler::new(
        router,
        provider,
        fallback,
        accountant,
    ));

    let app = http::app(
        ChatAppState::new(complete_handler, stream_handler),
        HealthState::new(pool.clone(), config.provider.health_check_timeout()),
        UsageState::new(log_store),
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let addr = config.server.socket_addr()?;
    info!(%addr, "llm-gateway listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn init_tracing(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));
    if config.is_production() {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received, draining");
}
