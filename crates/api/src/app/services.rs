//! Service wiring: storage backend, policy, token signer and the entity
//! services built on them.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use figment::Figment;
use figment::providers::{Format, Toml};

use adminhub_auth::{
    Argon2Hasher, JwtSigner, PasswordHasher, PolicyEngine, PolicyFile, TokenSigner,
    UuidTokenGenerator,
};
use adminhub_countries::CountryService;
use adminhub_infra::{AppConfig, Ctx, DbType, InMemoryStorage, PgStorage, Storage, db};
use adminhub_users::{SessionService, UserService, seed_superadmin};

pub type SharedStorage = Arc<dyn Storage>;

/// Everything request handlers need, shared behind an `Arc`.
pub struct AppServices {
    pub users: UserService<SharedStorage>,
    pub sessions: SessionService<SharedStorage>,
    pub countries: CountryService<SharedStorage>,
    pub policy: Arc<PolicyEngine>,
    pub signer: Arc<dyn TokenSigner>,
}

impl AppServices {
    pub fn new(
        storage: SharedStorage,
        policy: Arc<PolicyEngine>,
        signer: Arc<dyn TokenSigner>,
        hasher: Arc<dyn PasswordHasher>,
    ) -> Self {
        Self {
            users: UserService::new(Arc::clone(&storage), Arc::clone(&policy), Arc::clone(&hasher)),
            sessions: SessionService::new(
                Arc::clone(&storage),
                hasher,
                Arc::clone(&signer),
                Arc::new(UuidTokenGenerator),
            ),
            countries: CountryService::new(storage, Arc::clone(&policy)),
            policy,
            signer,
        }
    }
}

/// Rules from `POLICY_FILE` when configured, the built-in set otherwise.
/// `DEBUG` turns on strict validation of the rule set. A configured file that
/// does not exist is an error, not an empty rule set.
pub fn load_policy(config: &AppConfig) -> anyhow::Result<PolicyEngine> {
    let strict = config.debug;
    let engine = match config.policy_file.as_deref() {
        Some(path) => {
            if !Path::new(path).is_file() {
                anyhow::bail!("policy file {path} does not exist");
            }
            let file: PolicyFile = Figment::from(Toml::file(path))
                .extract()
                .with_context(|| format!("failed to read policy file {path}"))?;
            tracing::info!(path, rules = file.rules.len(), strict, "policy loaded from file");
            PolicyEngine::new(file.rules, strict)?
        }
        None => PolicyEngine::with_default_rules(strict)?,
    };
    Ok(engine)
}

pub async fn connect_storage(config: &AppConfig) -> anyhow::Result<SharedStorage> {
    match config.db_type {
        DbType::Postgres => {
            let pool = db::connect(config).await.context("failed to connect to postgres")?;
            Ok(Arc::new(PgStorage::new(pool).log_statements(config.db_log)))
        }
        DbType::Memory => {
            tracing::warn!("using in-memory storage; data is lost on restart");
            Ok(Arc::new(InMemoryStorage::new()))
        }
    }
}

pub async fn build_services(config: &AppConfig) -> anyhow::Result<AppServices> {
    let storage = connect_storage(config).await?;
    let policy = Arc::new(load_policy(config)?);
    let signer: Arc<dyn TokenSigner> = Arc::new(
        JwtSigner::new(&config.jwt_algorithm, config.jwt_secret(), config.jwt_duration)
            .context("invalid JWT configuration")?,
    );
    let hasher: Arc<dyn PasswordHasher> = Arc::new(Argon2Hasher::new());

    // The in-memory store starts empty, so seed the first account here.
    if config.db_type == DbType::Memory {
        if let Some(password) = config.superadmin_password.as_deref() {
            seed_superadmin(&Ctx::background(), Arc::clone(&storage), hasher.as_ref(), password)
                .await
                .context("failed to seed superadmin")?;
        }
    }

    Ok(AppServices::new(storage, policy, signer, hasher))
}
