//! OpenGeo Server: Application entry point.

use opengeo_db::{DbManager, run_migrations};
use opengeo_server::{AppState, ServerConfig, build_router};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::load_with_dotenv()?;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    tracing::info!("Starting OpenGeo server...");

    let db = DbManager::connect(&config.db).await?;
    run_migrations(db.client()).await?;

    let state = AppState::new(db.client().clone(), config.service_config());
    let listener = tokio::net::TcpListener::bind(config.socket_addr()?).await?;
    tracing::info!(address = %config.bind_address, "Listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("OpenGeo server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
