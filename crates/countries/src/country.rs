use chrono::{DateTime, Utc};
use serde::Serialize;

use adminhub_core::schema::{CREATED_AT, ID, UPDATED_AT};
use adminhub_core::{DecodeError, Entity, EntityId, EntitySchema, FieldDef, FieldKind, Record};
use adminhub_infra::Filter;

pub const NAME: FieldDef = FieldDef::new("name", FieldKind::Text).unique();
pub const CODE: FieldDef = FieldDef::new("code", FieldKind::Text);
pub const PHONE_CODE: FieldDef = FieldDef::new("phone_code", FieldKind::Text);

pub static COUNTRY_SCHEMA: EntitySchema = EntitySchema {
    entity: "Country",
    table: "countries",
    fields: &[ID, NAME, CODE, PHONE_CODE, CREATED_AT, UPDATED_AT],
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Country {
    pub id: EntityId,
    pub name: String,
    pub code: String,
    pub phone_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entity for Country {
    fn schema() -> &'static EntitySchema {
        &COUNTRY_SCHEMA
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with(&ID, self.id)
            .with(&NAME, self.name.as_str())
            .with(&CODE, self.code.as_str())
            .with(&PHONE_CODE, self.phone_code.as_str())
            .with(&CREATED_AT, self.created_at)
            .with(&UPDATED_AT, self.updated_at)
    }

    fn from_record(mut record: Record) -> Result<Self, DecodeError> {
        Ok(Self {
            id: record.take_id(&ID)?,
            name: record.take_text(&NAME)?,
            code: record.take_text(&CODE)?,
            phone_code: record.take_text(&PHONE_CODE)?,
            created_at: record.take_timestamp(&CREATED_AT)?,
            updated_at: record.take_timestamp(&UPDATED_AT)?,
        })
    }
}

/// Another country already using `name`; `except` excludes a record's own id.
pub fn name_taken(name: &str, except: Option<EntityId>) -> Filter {
    let filter = Filter::new().eq(&NAME, name);
    match except {
        Some(id) => filter.not_exact(&ID, id),
        None => filter,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_mapping_is_lossless() {
        let now = Utc::now();
        let vn = Country {
            id: EntityId::new(5),
            name: "Vietnam".into(),
            code: "VN".into(),
            phone_code: "+84".into(),
            created_at: now,
            updated_at: now,
        };
        assert_eq!(Country::from_record(vn.to_record()).unwrap(), vn);
    }

    #[test]
    fn uniqueness_filter_excludes_own_id() {
        assert_eq!(name_taken("Vietnam", None).conditions().len(), 1);
        let scoped = name_taken("Vietnam", Some(EntityId::new(5)));
        let fields: Vec<_> = scoped.conditions().iter().map(|c| c.field).collect();
        assert_eq!(fields, vec!["name", "id"]);
    }
}
