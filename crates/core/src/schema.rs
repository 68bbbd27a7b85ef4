//! Storage-neutral entity schema descriptors and field values.
//!
//! An [`EntitySchema`] names the table and the typed fields of an entity. The
//! query layer validates filter/sort/update field names against it and the
//! storage backends use it to translate records to and from rows.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::id::EntityId;

/// Primitive type of a persisted field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    Int,
    Text,
    Bool,
    Timestamp,
}

impl core::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            FieldKind::Int => "integer",
            FieldKind::Text => "text",
            FieldKind::Bool => "boolean",
            FieldKind::Timestamp => "timestamp",
        };
        f.write_str(s)
    }
}

/// Declaration of one entity field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
    pub nullable: bool,
    /// May appear in request filters.
    pub filterable: bool,
    /// May appear in request ordering.
    pub sortable: bool,
    /// May appear in a changeset.
    pub updatable: bool,
    /// Backed by a unique constraint.
    pub unique: bool,
}

impl FieldDef {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            nullable: false,
            filterable: true,
            sortable: true,
            updatable: true,
            unique: false,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub const fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub const fn read_only(mut self) -> Self {
        self.updatable = false;
        self
    }

    /// Never exposed to request filters or ordering (hashes, tokens).
    pub const fn secret(mut self) -> Self {
        self.filterable = false;
        self.sortable = false;
        self
    }

    /// Whether `value` can be stored in this field.
    pub fn accepts(&self, value: &Value) -> bool {
        match value.kind() {
            None => self.nullable,
            Some(kind) => kind == self.kind,
        }
    }
}

/// Identity column shared by every entity.
pub const ID: FieldDef = FieldDef::new("id", FieldKind::Int).read_only();
/// Creation timestamp, maintained by the repository.
pub const CREATED_AT: FieldDef = FieldDef::new("created_at", FieldKind::Timestamp).read_only();
/// Last-modification timestamp, maintained by the repository.
pub const UPDATED_AT: FieldDef = FieldDef::new("updated_at", FieldKind::Timestamp).read_only();

/// Table + field declarations for one entity type.
#[derive(Debug)]
pub struct EntitySchema {
    /// Human-readable entity name used in messages ("User", "Country").
    pub entity: &'static str,
    pub table: &'static str,
    /// All persisted fields, including `id`, `created_at` and `updated_at`.
    pub fields: &'static [FieldDef],
}

impl EntitySchema {
    pub fn field(&self, name: &str) -> Option<&'static FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Fields written on insert (everything but the identity).
    pub fn insertable(&self) -> impl Iterator<Item = &'static FieldDef> + '_ {
        self.fields.iter().filter(|f| f.name != ID.name)
    }
}

/// A typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
}

impl Value {
    /// `None` for `Null`.
    pub fn kind(&self) -> Option<FieldKind> {
        match self {
            Value::Null => None,
            Value::Bool(_) => Some(FieldKind::Bool),
            Value::Int(_) => Some(FieldKind::Int),
            Value::Text(_) => Some(FieldKind::Text),
            Value::Timestamp(_) => Some(FieldKind::Timestamp),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Ordering between two values of the same kind. `Null` sorts first.
    pub fn compare(&self, other: &Value) -> Option<core::cmp::Ordering> {
        use core::cmp::Ordering;
        match (self, other) {
            (Value::Null, Value::Null) => Some(Ordering::Equal),
            (Value::Null, _) => Some(Ordering::Less),
            (_, Value::Null) => Some(Ordering::Greater),
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
            (Value::Timestamp(a), Value::Timestamp(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<EntityId> for Value {
    fn from(v: EntityId) -> Self {
        Value::Int(v.get())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Value::Timestamp(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("missing field '{0}'")]
    MissingField(&'static str),

    #[error("field '{field}' is not a {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: FieldKind,
    },

    #[error("field '{field}' holds an unexpected value '{value}'")]
    InvalidValue { field: &'static str, value: String },
}

/// One persisted row, keyed by schema field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: BTreeMap<&'static str, Value>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &FieldDef, value: impl Into<Value>) -> Self {
        self.set(field.name, value);
        self
    }

    pub fn set(&mut self, name: &'static str, value: impl Into<Value>) {
        self.values.insert(name, value.into());
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn remove(&mut self, name: &str) -> Option<Value> {
        self.values.remove(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter().map(|(k, v)| (*k, v))
    }

    fn take(&mut self, field: &FieldDef) -> Result<Value, DecodeError> {
        self.values
            .remove(field.name)
            .ok_or(DecodeError::MissingField(field.name))
    }

    pub fn take_int(&mut self, field: &FieldDef) -> Result<i64, DecodeError> {
        match self.take(field)? {
            Value::Int(v) => Ok(v),
            _ => Err(mismatch(field)),
        }
    }

    pub fn take_id(&mut self, field: &FieldDef) -> Result<EntityId, DecodeError> {
        self.take_int(field).map(EntityId::new)
    }

    pub fn take_text(&mut self, field: &FieldDef) -> Result<String, DecodeError> {
        match self.take(field)? {
            Value::Text(v) => Ok(v),
            _ => Err(mismatch(field)),
        }
    }

    pub fn take_opt_text(&mut self, field: &FieldDef) -> Result<Option<String>, DecodeError> {
        match self.take(field)? {
            Value::Null => Ok(None),
            Value::Text(v) => Ok(Some(v)),
            _ => Err(mismatch(field)),
        }
    }

    pub fn take_bool(&mut self, field: &FieldDef) -> Result<bool, DecodeError> {
        match self.take(field)? {
            Value::Bool(v) => Ok(v),
            _ => Err(mismatch(field)),
        }
    }

    pub fn take_timestamp(&mut self, field: &FieldDef) -> Result<DateTime<Utc>, DecodeError> {
        match self.take(field)? {
            Value::Timestamp(v) => Ok(v),
            _ => Err(mismatch(field)),
        }
    }

    pub fn take_opt_timestamp(
        &mut self,
        field: &FieldDef,
    ) -> Result<Option<DateTime<Utc>>, DecodeError> {
        match self.take(field)? {
            Value::Null => Ok(None),
            Value::Timestamp(v) => Ok(Some(v)),
            _ => Err(mismatch(field)),
        }
    }
}

fn mismatch(field: &FieldDef) -> DecodeError {
    DecodeError::TypeMismatch {
        field: field.name,
        expected: field.kind,
    }
}
