//! Partial updates.

use adminhub_core::{EntitySchema, FieldDef, Record, Value};

use super::QueryError;

/// The set of fields an update writes.
///
/// Only fields explicitly set end up in the changeset; update DTOs carry
/// `Option<T>` fields and pass them through [`Changeset::set_opt`], so omitted
/// request fields are never touched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changeset {
    values: Record,
    len: usize,
}

impl Changeset {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, field: &FieldDef, value: impl Into<Value>) -> Self {
        if self.values.get(field.name).is_none() {
            self.len += 1;
        }
        self.values.set(field.name, value);
        self
    }

    /// Set `field` only when `value` is present.
    pub fn set_opt<T: Into<Value>>(self, field: &FieldDef, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(field, v),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &Value)> {
        self.values.iter()
    }

    /// Every field must exist in `schema`, be updatable and accept the value.
    pub fn validate(&self, schema: &EntitySchema) -> Result<(), QueryError> {
        for (name, value) in self.values.iter() {
            let field = schema
                .field(name)
                .ok_or_else(|| QueryError::UnknownField(name.to_string()))?;
            if !field.updatable {
                return Err(QueryError::ReadOnlyField(name.to_string()));
            }
            if !field.accepts(value) {
                return Err(QueryError::InvalidValue {
                    field: name.to_string(),
                    message: format!("expected {}", field.kind),
                });
            }
        }
        Ok(())
    }

    pub fn into_record(self) -> Record {
        self.values
    }
}
