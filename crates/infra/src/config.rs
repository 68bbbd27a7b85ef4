//! Application configuration.
//!
//! Layers, lowest precedence first: built-in defaults, an optional TOML file
//! (`CONFIG_FILE`, default `config/default.toml`), then environment variables
//! (a `.env` file is loaded into the environment first).

use std::time::Duration;

use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Secret used in development when `JWT_SECRET` is unset.
pub const DEV_JWT_SECRET: &str = "dev-secret";

const ENV_KEYS: &[&str] = &[
    "stage",
    "host",
    "port",
    "read_timeout",
    "write_timeout",
    "allow_origins",
    "debug",
    "db_type",
    "db_dsn",
    "db_log",
    "db_max_connections",
    "jwt_secret",
    "jwt_duration",
    "jwt_algorithm",
    "policy_file",
    "superadmin_password",
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load config: {0}")]
    Load(#[from] figment::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DbType {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub stage: String,
    pub host: String,
    pub port: u16,
    /// Per-request deadline for storage work, seconds.
    pub read_timeout: u64,
    /// Upper bound on total request handling, seconds.
    pub write_timeout: u64,
    /// Comma separated; `*` allows any origin.
    pub allow_origins: String,
    pub debug: bool,
    pub db_type: DbType,
    pub db_dsn: Option<String>,
    pub db_log: bool,
    pub db_max_connections: u32,
    pub jwt_secret: Option<String>,
    /// Access token validity, seconds.
    pub jwt_duration: i64,
    pub jwt_algorithm: String,
    pub policy_file: Option<String>,
    pub superadmin_password: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stage: "development".into(),
            host: "0.0.0.0".into(),
            port: 8080,
            read_timeout: 10,
            write_timeout: 15,
            allow_origins: "*".into(),
            debug: false,
            db_type: DbType::Memory,
            db_dsn: None,
            db_log: false,
            db_max_connections: 10,
            jwt_secret: None,
            jwt_duration: 3600,
            jwt_algorithm: "HS256".into(),
            policy_file: None,
            superadmin_password: None,
        }
    }
}

impl AppConfig {
    /// Load from `.env`, the config file and the process environment.
    pub fn load() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let file = std::env::var("CONFIG_FILE").unwrap_or_else(|_| "config/default.toml".into());
        Self::from_figment(Self::figment(&file))
    }

    /// The standard provider chain without extracting.
    pub fn figment(config_file: &str) -> Figment {
        Figment::from(Serialized::defaults(AppConfig::default()))
            .merge(Toml::file(config_file))
            .merge(Env::raw().only(ENV_KEYS))
    }

    pub fn from_figment(figment: Figment) -> Result<Self, ConfigError> {
        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    pub fn is_development(&self) -> bool {
        self.stage == "development"
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.db_type == DbType::Postgres && self.db_dsn.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Invalid("DB_DSN is required when DB_TYPE=postgres".into()));
        }
        if !self.is_development() && self.jwt_secret.as_deref().is_none_or(str::is_empty) {
            return Err(ConfigError::Invalid(format!(
                "JWT_SECRET is required in stage '{}'",
                self.stage
            )));
        }
        if self.jwt_duration <= 0 {
            return Err(ConfigError::Invalid("JWT_DURATION must be positive".into()));
        }
        if self.read_timeout == 0 || self.write_timeout == 0 {
            return Err(ConfigError::Invalid("timeouts must be positive".into()));
        }
        Ok(())
    }

    /// Configured secret, or the development default.
    pub fn jwt_secret(&self) -> &str {
        match self.jwt_secret.as_deref() {
            Some(secret) if !secret.is_empty() => secret,
            _ => {
                tracing::warn!("JWT_SECRET not set; using insecure dev default");
                DEV_JWT_SECRET
            }
        }
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout)
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_secs(self.write_timeout)
    }

    /// `None` means any origin.
    pub fn allowed_origins(&self) -> Option<Vec<String>> {
        let origins: Vec<String> = self
            .allow_origins
            .split(',')
            .map(str::trim)
            .filter(|o| !o.is_empty())
            .map(str::to_string)
            .collect();
        if origins.is_empty() || origins.iter().any(|o| o == "*") {
            None
        } else {
            Some(origins)
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
