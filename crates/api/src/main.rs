use anyhow::Result;
use tracing::info;

use relay_api::{
    app::{create_app, Stores},
    config::Config,
    middleware::{init_metrics, logging::init_logging},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let config = Config::load()?;

    init_logging(&config.logging);
    init_metrics()?;

    info!("Starting Location Relay v{}", env!("CARGO_PKG_VERSION"));

    let stores = Stores::connect(&config.database.to_pool_config()).await?;

    let addr = config.socket_addr()?;
    let app = create_app(config, stores);

    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
