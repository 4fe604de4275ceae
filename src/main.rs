use std::sync::Arc;

use anyhow::{bail, Context};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use event_api::config;
use event_api::database::{DatabaseManager, PgStore};
use event_api::{app, is_production, AppState};

#[derive(Parser, Debug)]
#[command(name = "event-api-rust", version, about = "Event FAQ and microlocation JSON:API server")]
struct Args {
    /// Port to listen on (overrides EVENT_API_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Apply database migrations before serving
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,event_api=debug")))
        .init();

    let args = Args::parse();

    // Initialize configuration (this loads the config singleton)
    let config = config::config();
    info!("Starting Event API in {:?} mode", config.environment);

    if is_production!() && config.security.jwt_secret.is_empty() {
        bail!("JWT_SECRET must be set in production");
    }

    let manager = DatabaseManager::connect_lazy(&config.database).context("failed to configure database pool")?;
    if args.migrate {
        manager.migrate().await.context("failed to run migrations")?;
    }

    let state = AppState::new(Arc::new(PgStore::new(manager.clone())));

    let port = args.port.unwrap_or(config.api.port);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Event API listening on http://{}{}", bind_addr, config.api.base_path);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    manager.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    info!("Shutdown signal received");
}
