use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use auction_lab::database::repository::SqliteStore;
use auction_lab::services::RoundCoordinator;
use auction_lab::{AppState, Config, app, database};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auction_lab=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!(
        environment = %config.environment,
        total_rounds = config.total_rounds,
        "Starting auction server"
    );

    let db = database::setup_database(&config.database_url).await?;
    database::run_migrations(&db).await?;

    let store = Arc::new(SqliteStore::new(db.clone()));
    let coordinator = Arc::new(RoundCoordinator::recover(store.clone(), config.total_rounds).await?);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let state = AppState {
        db,
        config,
        store,
        coordinator,
    };

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);
    info!("API docs available at http://{}/api/docs", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping server");
}
