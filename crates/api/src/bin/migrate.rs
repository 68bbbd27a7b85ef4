//! Create the schema and seed the `superadmin` account.

use anyhow::{Context, bail};

use adminhub_auth::Argon2Hasher;
use adminhub_infra::{AppConfig, Ctx, DbType, PgStorage, db};
use adminhub_observability::LogSettings;
use adminhub_users::seed_superadmin;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;
    adminhub_observability::init(&LogSettings::for_stage(&config.stage, config.debug));

    if config.db_type != DbType::Postgres {
        bail!("migrations require DB_TYPE=postgres");
    }

    let pool = db::connect(&config).await.context("failed to connect to postgres")?;
    db::migrate(&pool).await.context("migration failed")?;

    match config.superadmin_password.as_deref() {
        Some(password) => {
            let created = seed_superadmin(
                &Ctx::background(),
                PgStorage::new(pool),
                &Argon2Hasher::new(),
                password,
            )
            .await?;
            tracing::info!(created, "superadmin seed finished");
        }
        None => tracing::warn!("SUPERADMIN_PASSWORD not set; skipping superadmin seed"),
    }
    Ok(())
}
