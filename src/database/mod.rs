use anyhow::Result;
use sqlx::{Pool, Sqlite, sqlite::SqlitePoolOptions};
use std::time::Duration;
use tracing::info;

pub mod repository;

pub type DatabasePool = Pool<Sqlite>;

/// Embedded migrations, shared with the test suites
pub static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn setup_database(database_url: &str) -> Result<DatabasePool> {
    info!("Connecting to database: {}", database_url);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(3))
        .connect(database_url)
        .await?;

    // Enforce referential integrity; SQLite ships with it off
    sqlx::query("PRAGMA foreign_keys = ON").execute(&pool).await?;
    sqlx::query("SELECT 1").execute(&pool).await?;

    info!("Database connection established");
    Ok(pool)
}

pub async fn run_migrations(pool: &DatabasePool) -> Result<()> {
    info!("Running database migrations");
    MIGRATOR.run(pool).await?;
    info!("Database migrations completed successfully");
    Ok(())
}
