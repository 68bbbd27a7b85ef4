//! Generic, schema-driven repository.
//!
//! [`Repository`] turns filters, list queries and changesets into calls on a
//! [`Storage`] backend for any [`Entity`], and maintains `created_at` /
//! `updated_at`. Every backend call runs under the request [`Ctx`].

#[cfg(any(test, feature = "test-util"))]
mod faulty;
mod memory;
mod postgres;
mod storage;

#[cfg(any(test, feature = "test-util"))]
pub use faulty::{FaultyStorage, StorageOp};
pub use memory::InMemoryStorage;
pub use postgres::PgStorage;
pub use storage::{Selection, Storage, StorageError};

use std::marker::PhantomData;

use chrono::Utc;
use thiserror::Error;
use tracing::instrument;

use adminhub_core::schema::{CREATED_AT, ID, UPDATED_AT};
use adminhub_core::{DecodeError, DomainError, Entity, EntityId, EntitySchema, Record};

use crate::context::{Cancelled, Ctx};
use crate::query::{Changeset, Filter, ListQuery, Page, Predicate, QueryError};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepoError {
    /// Zero or more than one record matched a single-record lookup.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A unique constraint rejected the write.
    #[error("{entity} conflicts with an existing record ({constraint})")]
    Conflict {
        entity: &'static str,
        constraint: String,
    },

    #[error(transparent)]
    Invalid(#[from] QueryError),

    #[error("operation cancelled")]
    Cancelled,

    #[error(transparent)]
    Storage(StorageError),

    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
}

impl From<Cancelled> for RepoError {
    fn from(_: Cancelled) -> Self {
        RepoError::Cancelled
    }
}

impl RepoError {
    /// Convert into the service error, using `context` as the user-facing
    /// message for backend failures.
    pub fn into_domain(self, context: &str) -> DomainError {
        match self {
            RepoError::NotFound { entity } => DomainError::not_found(format!("{entity} not found")),
            RepoError::Conflict { entity, .. } => {
                DomainError::conflict(format!("{entity} already exists"))
            }
            RepoError::Invalid(err) => err.into(),
            RepoError::Cancelled => DomainError::Cancelled,
            err @ (RepoError::Storage(_) | RepoError::Decode(_)) => {
                tracing::error!(error = %err, "{context}");
                DomainError::internal(context, err)
            }
        }
    }
}

/// Which record(s) an operation addresses.
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
    Id(EntityId),
    Filter(Filter),
}

impl From<EntityId> for Criteria {
    fn from(id: EntityId) -> Self {
        Criteria::Id(id)
    }
}

impl From<Filter> for Criteria {
    fn from(filter: Filter) -> Self {
        Criteria::Filter(filter)
    }
}

impl Criteria {
    fn predicate(&self, schema: &EntitySchema) -> Result<Predicate, QueryError> {
        match self {
            Criteria::Id(id) => Ok(Filter::new().eq(&ID, *id).predicate()),
            Criteria::Filter(filter) => {
                check_fields(schema, filter)?;
                Ok(filter.predicate())
            }
        }
    }
}

fn check_fields(schema: &EntitySchema, filter: &Filter) -> Result<(), QueryError> {
    for cond in filter.conditions() {
        let field = schema
            .field(cond.field)
            .ok_or_else(|| QueryError::UnknownField(cond.field.to_string()))?;
        if !cond.value.is_null() && !field.accepts(&cond.value) {
            return Err(QueryError::InvalidValue {
                field: field.name.to_string(),
                message: format!("expected {}", field.kind),
            });
        }
    }
    Ok(())
}

/// Repository for entity `E` over storage `S`.
#[derive(Debug)]
pub struct Repository<E, S> {
    storage: S,
    _entity: PhantomData<fn() -> E>,
}

impl<E, S: Clone> Clone for Repository<E, S> {
    fn clone(&self) -> Self {
        Self {
            storage: self.storage.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E, S> Repository<E, S>
where
    E: Entity,
    S: Storage,
{
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            _entity: PhantomData,
        }
    }

    fn schema() -> &'static EntitySchema {
        E::schema()
    }

    fn map_storage(err: StorageError) -> RepoError {
        match err {
            StorageError::UniqueViolation { constraint, .. } => RepoError::Conflict {
                entity: Self::schema().entity,
                constraint,
            },
            StorageError::Decode(e) => RepoError::Decode(e),
            other => RepoError::Storage(other),
        }
    }

    fn not_found() -> RepoError {
        RepoError::NotFound {
            entity: Self::schema().entity,
        }
    }

    /// Persist a new entity; identity and timestamps are assigned here.
    #[instrument(skip_all, fields(table = E::schema().table, operation = "create"), err)]
    pub async fn create(&self, ctx: &Ctx, entity: &E) -> Result<E, RepoError> {
        let schema = Self::schema();
        let now = Utc::now();

        let mut record = entity.to_record();
        record.remove(ID.name);
        record.set(CREATED_AT.name, now);
        record.set(UPDATED_AT.name, now);

        for field in schema.insertable() {
            let value = record
                .get(field.name)
                .ok_or(DecodeError::MissingField(field.name))?;
            if !field.accepts(value) {
                return Err(QueryError::InvalidValue {
                    field: field.name.to_string(),
                    message: format!("expected {}", field.kind),
                }
                .into());
            }
        }

        let stored = ctx
            .run(self.storage.insert(schema, record))
            .await?
            .map_err(Self::map_storage)?;
        Ok(E::from_record(stored)?)
    }

    /// Exactly one match, otherwise `NotFound` (ambiguity is never resolved by
    /// picking a row).
    #[instrument(skip_all, fields(table = E::schema().table, operation = "view"), err)]
    pub async fn view(&self, ctx: &Ctx, criteria: impl Into<Criteria>) -> Result<E, RepoError> {
        let schema = Self::schema();
        let predicate = criteria.into().predicate(schema)?;
        let selection = Selection {
            limit: Some(2),
            ..Selection::matching(predicate)
        };

        let mut rows = ctx
            .run(self.storage.select(schema, &selection))
            .await?
            .map_err(Self::map_storage)?;
        if rows.len() != 1 {
            return Err(Self::not_found());
        }
        match rows.pop() {
            Some(row) => Ok(E::from_record(row)?),
            None => Err(Self::not_found()),
        }
    }

    /// One page plus the count of all matching rows.
    #[instrument(skip_all, fields(table = E::schema().table, operation = "list"), err)]
    pub async fn list(&self, ctx: &Ctx, query: &ListQuery) -> Result<Page<E>, RepoError> {
        let schema = Self::schema();
        check_fields(schema, &query.filter)?;
        let predicate = query.filter.predicate();

        let selection = Selection {
            predicate: predicate.clone(),
            order: query.ordering(),
            limit: Some(query.pagination.limit),
            offset: query.pagination.offset,
        };

        let total_count = ctx
            .run(self.storage.count(schema, &predicate))
            .await?
            .map_err(Self::map_storage)?;
        let rows = ctx
            .run(self.storage.select(schema, &selection))
            .await?
            .map_err(Self::map_storage)?;

        let records = rows
            .into_iter()
            .map(E::from_record)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            records,
            total_count,
        })
    }

    /// Write only the fields in `changes`. An empty changeset performs no write.
    #[instrument(skip_all, fields(table = E::schema().table, operation = "update", id = %id), err)]
    pub async fn update(&self, ctx: &Ctx, id: EntityId, changes: Changeset) -> Result<(), RepoError> {
        let schema = Self::schema();
        changes.validate(schema)?;
        if changes.is_empty() {
            return Ok(());
        }

        let mut record: Record = changes.into_record();
        record.set(UPDATED_AT.name, Utc::now());
        let predicate = Criteria::Id(id).predicate(schema)?;

        let affected = ctx
            .run(self.storage.update(schema, &predicate, &record))
            .await?
            .map_err(Self::map_storage)?;
        if affected == 0 {
            return Err(Self::not_found());
        }
        Ok(())
    }

    /// Hard delete by id.
    #[instrument(skip_all, fields(table = E::schema().table, operation = "delete", id = %id), err)]
    pub async fn delete(&self, ctx: &Ctx, id: EntityId) -> Result<(), RepoError> {
        let schema = Self::schema();
        let predicate = Criteria::Id(id).predicate(schema)?;
        let affected = ctx
            .run(self.storage.delete(schema, &predicate))
            .await?
            .map_err(Self::map_storage)?;
        if affected == 0 {
            return Err(Self::not_found());
        }
        Ok(())
    }

    /// Whether at least one record matches.
    #[instrument(skip_all, fields(table = E::schema().table, operation = "exist"), err)]
    pub async fn exist(&self, ctx: &Ctx, criteria: impl Into<Criteria>) -> Result<bool, RepoError> {
        let schema = Self::schema();
        let predicate = criteria.into().predicate(schema)?;
        let count = ctx
            .run(self.storage.count(schema, &predicate))
            .await?
            .map_err(Self::map_storage)?;
        Ok(count > 0)
    }
}

#[cfg(test)]
mod tests;
