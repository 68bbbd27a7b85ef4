//! Storage wrapper that fails selected operations on demand.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use adminhub_core::{EntitySchema, Record};

use crate::query::Predicate;

use super::storage::{Selection, Storage, StorageError};

/// A [`Storage`] call kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageOp {
    Insert,
    Select,
    Count,
    Update,
    Delete,
}

/// Delegates to `inner` except for the operations marked failing, which
/// return [`StorageError::Backend`] without reaching it.
#[derive(Debug)]
pub struct FaultyStorage<S> {
    inner: S,
    failing: Mutex<HashSet<StorageOp>>,
}

impl<S: Storage> FaultyStorage<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            failing: Mutex::new(HashSet::new()),
        }
    }

    pub fn fail(&self, op: StorageOp) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).insert(op);
    }

    pub fn heal(&self, op: StorageOp) {
        self.failing.lock().unwrap_or_else(|e| e.into_inner()).remove(&op);
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    fn check(&self, op: StorageOp) -> Result<(), StorageError> {
        let failing = self.failing.lock().unwrap_or_else(|e| e.into_inner());
        if failing.contains(&op) {
            return Err(StorageError::Backend(format!("injected {op:?} failure")));
        }
        Ok(())
    }
}

#[async_trait]
impl<S: Storage> Storage for FaultyStorage<S> {
    async fn insert(
        &self,
        schema: &'static EntitySchema,
        record: Record,
    ) -> Result<Record, StorageError> {
        self.check(StorageOp::Insert)?;
        self.inner.insert(schema, record).await
    }

    async fn select(
        &self,
        schema: &'static EntitySchema,
        selection: &Selection,
    ) -> Result<Vec<Record>, StorageError> {
        self.check(StorageOp::Select)?;
        self.inner.select(schema, selection).await
    }

    async fn count(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, StorageError> {
        self.check(StorageOp::Count)?;
        self.inner.count(schema, predicate).await
    }

    async fn update(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
        changes: &Record,
    ) -> Result<u64, StorageError> {
        self.check(StorageOp::Update)?;
        self.inner.update(schema, predicate, changes).await
    }

    async fn delete(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, StorageError> {
        self.check(StorageOp::Delete)?;
        self.inner.delete(schema, predicate).await
    }
}
