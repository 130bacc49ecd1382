//! EduFund Currency Server Binary

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use edufund_server::{router, AppState, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = ServerConfig::from_env();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.log_level.clone()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting EduFund currency server");

    if let Err(e) = config.validate() {
        error!(error = %e, "Invalid configuration");
        return Err(anyhow::anyhow!("Configuration error: {}", e));
    }

    if !config.has_api_key() {
        warn!("OPENEXCHANGERATES_API_KEY not set, serving fallback rates only");
    }

    let state = AppState::new(config.clone())?;
    let app = router(state);

    let addr = config.socket_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!(
        listen_addr = %config.listen_addr,
        listen_port = config.listen_port,
        cache_ttl_secs = config.rates.cache_ttl.as_secs(),
        coalesce_refreshes = config.rates.coalesce_refreshes,
        "Currency server running"
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Currency server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
