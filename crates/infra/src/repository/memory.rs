use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;

use adminhub_core::schema::ID;
use adminhub_core::{EntitySchema, Record, Value};

use crate::query::{Direction, OrderBy, Predicate};

use super::storage::{Selection, Storage, StorageError};

#[derive(Debug, Default)]
struct Table {
    next_id: i64,
    rows: BTreeMap<i64, Record>,
}

/// In-memory storage for tests/dev.
///
/// Tables are created on first use. Fields declared `unique` in the schema are
/// enforced like a database constraint; `Null` never collides.
#[derive(Debug, Default)]
pub struct InMemoryStorage {
    tables: RwLock<HashMap<&'static str, Table>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> StorageError {
    StorageError::Backend("in-memory storage lock poisoned".into())
}

/// First unique field on which `candidate` collides with another row.
fn unique_conflict<'a>(
    schema: &EntitySchema,
    candidate: &Record,
    others: impl Iterator<Item = &'a Record> + Clone,
) -> Option<&'static str> {
    schema
        .fields
        .iter()
        .filter(|f| f.unique)
        .find(|f| match candidate.get(f.name) {
            None | Some(Value::Null) => false,
            Some(value) => others.clone().any(|row| row.get(f.name) == Some(value)),
        })
        .map(|f| f.name)
}

fn violation(schema: &EntitySchema, field: &str) -> StorageError {
    StorageError::UniqueViolation {
        table: schema.table.to_string(),
        constraint: format!("{}_{}_key", schema.table, field),
    }
}

fn compare_rows(a: &Record, b: &Record, order: &[OrderBy]) -> Ordering {
    for key in order {
        let left = a.get(key.field).unwrap_or(&Value::Null);
        let right = b.get(key.field).unwrap_or(&Value::Null);
        let ord = left.compare(right).unwrap_or(Ordering::Equal);
        let ord = match key.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn insert(
        &self,
        schema: &'static EntitySchema,
        mut record: Record,
    ) -> Result<Record, StorageError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let table = tables.entry(schema.table).or_default();

        if let Some(field) = unique_conflict(schema, &record, table.rows.values()) {
            return Err(violation(schema, field));
        }

        table.next_id += 1;
        let id = table.next_id;
        record.set(ID.name, id);
        table.rows.insert(id, record.clone());
        Ok(record)
    }

    async fn select(
        &self,
        schema: &'static EntitySchema,
        selection: &Selection,
    ) -> Result<Vec<Record>, StorageError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let Some(table) = tables.get(schema.table) else {
            return Ok(Vec::new());
        };

        let mut rows: Vec<Record> = table
            .rows
            .values()
            .filter(|r| selection.predicate.matches(r))
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare_rows(a, b, &selection.order));

        let offset = usize::try_from(selection.offset).unwrap_or(usize::MAX);
        let limit = selection
            .limit
            .map(|l| usize::try_from(l).unwrap_or(usize::MAX))
            .unwrap_or(usize::MAX);
        Ok(rows.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, StorageError> {
        let tables = self.tables.read().map_err(|_| poisoned())?;
        let count = tables
            .get(schema.table)
            .map(|t| t.rows.values().filter(|r| predicate.matches(r)).count())
            .unwrap_or(0);
        Ok(count as u64)
    }

    async fn update(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
        changes: &Record,
    ) -> Result<u64, StorageError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let Some(table) = tables.get_mut(schema.table) else {
            return Ok(0);
        };

        let mut updated: BTreeMap<i64, Record> = BTreeMap::new();
        for (id, row) in table.rows.iter().filter(|(_, r)| predicate.matches(r)) {
            let mut next = row.clone();
            for (name, value) in changes.iter() {
                next.set(name, value.clone());
            }
            updated.insert(*id, next);
        }

        // Check against the table as it would look after the write.
        for (id, candidate) in &updated {
            let others = table
                .rows
                .iter()
                .filter(|(other, _)| *other != id)
                .map(|(other, row)| updated.get(other).unwrap_or(row));
            if let Some(field) = unique_conflict(schema, candidate, others) {
                return Err(violation(schema, field));
            }
        }

        let affected = updated.len() as u64;
        table.rows.extend(updated);
        Ok(affected)
    }

    async fn delete(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, StorageError> {
        let mut tables = self.tables.write().map_err(|_| poisoned())?;
        let Some(table) = tables.get_mut(schema.table) else {
            return Ok(0);
        };
        let before = table.rows.len();
        table.rows.retain(|_, r| !predicate.matches(r));
        Ok((before - table.rows.len()) as u64)
    }
}
