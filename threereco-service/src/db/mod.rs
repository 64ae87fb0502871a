//! Postgres pool construction and schema migrations for [`PgStore`](crate::store::PgStore).

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::store::StoreError;

/// Opens the pool and proves it with one round trip.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, StoreError> {
    tracing::info!(
        max_connections = config.max_connections,
        min_connections = config.min_connections,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(30))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .test_before_acquire(true)
        .connect(&config.url)
        .await?;

    sqlx::query("SELECT 1").execute(&pool).await?;
    tracing::info!("PostgreSQL connection established");

    Ok(pool)
}

/// Applies `migrations/` in order. Already-applied migrations are skipped.
pub async fn migrate(pool: &PgPool) -> Result<(), StoreError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|e| StoreError::Backend(anyhow::Error::new(e)))?;
    tracing::info!("Schema migrations applied");
    Ok(())
}
