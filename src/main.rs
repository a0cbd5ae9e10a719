use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use dispatch_hub::adapters::http::build_router;
use dispatch_hub::adapters::websocket::InMemoryConnectionRegistry;
use dispatch_hub::config::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;

    // RUST_LOG wins over the configured directive
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.server.log_level))?;
    if config.is_production() {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().pretty().with_env_filter(filter).init();
    }

    tracing::info!(
        environment = ?config.server.environment,
        outbound_queue_capacity = config.hub.outbound_queue_capacity,
        heartbeat_secs = config.hub.heartbeat_interval_secs,
        "Dispatch hub v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let registry = Arc::new(InMemoryConnectionRegistry::new());
    let app = build_router(&config, registry);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Dispatch hub stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
