//! Entity trait: identity + schema-driven record mapping.

use crate::id::EntityId;
use crate::schema::{DecodeError, EntitySchema, Record};

/// A persisted entity the generic repository can store.
///
/// `to_record` must emit every field of `schema()`; the repository overwrites
/// `id`, `created_at` and `updated_at` on insert.
pub trait Entity: Sized + Send + Sync + 'static {
    fn schema() -> &'static EntitySchema;

    /// Returns the entity identifier.
    fn id(&self) -> EntityId;

    fn to_record(&self) -> Record;

    fn from_record(record: Record) -> Result<Self, DecodeError>;
}
