//! `adminhub-infra`: data access and process configuration.
//!
//! Query descriptors, the generic repository with its storage backends, the
//! request context and configuration loading.

pub mod config;
pub mod context;
pub mod db;
pub mod query;
pub mod repository;

pub use config::{AppConfig, ConfigError, DbType};
pub use context::{Cancelled, Ctx};
pub use query::{Changeset, Filter, ListQuery, Operator, Page, QueryError};
pub use repository::{
    Criteria, InMemoryStorage, PgStorage, RepoError, Repository, Storage, StorageError,
};
#[cfg(any(test, feature = "test-util"))]
pub use repository::{FaultyStorage, StorageOp};
