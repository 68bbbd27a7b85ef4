//! Postgres pool and schema migration.

use std::time::Duration;

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use crate::config::AppConfig;

const INIT_SQL: &str = include_str!("../migrations/0001_init.sql");

/// Connect the shared pool described by `config`.
pub async fn connect(config: &AppConfig) -> Result<PgPool, sqlx::Error> {
    let dsn = config.db_dsn.as_deref().unwrap_or_default();
    PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.read_timeout))
        .connect(dsn)
        .await
}

/// Create tables and indexes. Idempotent.
pub async fn migrate(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(INIT_SQL).execute(pool).await?;
    tracing::info!("schema migrated");
    Ok(())
}
