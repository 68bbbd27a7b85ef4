use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use adminhub_core::{DecodeError, EntitySchema, Record};

use crate::query::{OrderBy, Predicate};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// A unique constraint rejected the write.
    #[error("unique constraint violated on {table}: {constraint}")]
    UniqueViolation { table: String, constraint: String },

    #[error("storage backend error: {0}")]
    Backend(String),

    #[error("row decode failed: {0}")]
    Decode(#[from] DecodeError),
}

/// Rows to read: predicate, ordering and window.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    pub predicate: Predicate,
    pub order: Vec<OrderBy>,
    pub limit: Option<u64>,
    pub offset: u64,
}

impl Selection {
    pub fn matching(predicate: Predicate) -> Self {
        Self {
            predicate,
            order: Vec::new(),
            limit: None,
            offset: 0,
        }
    }
}

/// Schema-driven persistence backend.
///
/// Implementations translate [`Record`]s and [`Predicate`]s for one store.
/// Each call is self-contained; no transaction spans two calls.
#[async_trait]
pub trait Storage: Send + Sync {
    /// Insert `record` and return the stored row, identity included.
    async fn insert(
        &self,
        schema: &'static EntitySchema,
        record: Record,
    ) -> Result<Record, StorageError>;

    async fn select(
        &self,
        schema: &'static EntitySchema,
        selection: &Selection,
    ) -> Result<Vec<Record>, StorageError>;

    async fn count(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, StorageError>;

    /// Write `changes` to every matching row; returns the affected row count.
    async fn update(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
        changes: &Record,
    ) -> Result<u64, StorageError>;

    /// Hard delete; returns the affected row count.
    async fn delete(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, StorageError>;
}

#[async_trait]
impl<S> Storage for Arc<S>
where
    S: Storage + ?Sized,
{
    async fn insert(
        &self,
        schema: &'static EntitySchema,
        record: Record,
    ) -> Result<Record, StorageError> {
        (**self).insert(schema, record).await
    }

    async fn select(
        &self,
        schema: &'static EntitySchema,
        selection: &Selection,
    ) -> Result<Vec<Record>, StorageError> {
        (**self).select(schema, selection).await
    }

    async fn count(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, StorageError> {
        (**self).count(schema, predicate).await
    }

    async fn update(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
        changes: &Record,
    ) -> Result<u64, StorageError> {
        (**self).update(schema, predicate, changes).await
    }

    async fn delete(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, StorageError> {
        (**self).delete(schema, predicate).await
    }
}
