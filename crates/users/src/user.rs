use chrono::{DateTime, Utc};
use serde::Serialize;

use adminhub_auth::{AuthUser, Role};
use adminhub_core::schema::{CREATED_AT, ID, UPDATED_AT};
use adminhub_core::{DecodeError, Entity, EntityId, EntitySchema, FieldDef, FieldKind, Record};
use adminhub_infra::Filter;

pub const FIRST_NAME: FieldDef = FieldDef::new("first_name", FieldKind::Text);
pub const LAST_NAME: FieldDef = FieldDef::new("last_name", FieldKind::Text);
pub const USERNAME: FieldDef = FieldDef::new("username", FieldKind::Text).unique().read_only();
pub const PASSWORD: FieldDef = FieldDef::new("password", FieldKind::Text).secret();
pub const EMAIL: FieldDef = FieldDef::new("email", FieldKind::Text);
pub const MOBILE: FieldDef = FieldDef::new("mobile", FieldKind::Text);
pub const ROLE: FieldDef = FieldDef::new("role", FieldKind::Text);
pub const BLOCKED: FieldDef = FieldDef::new("blocked", FieldKind::Bool);
pub const REFRESH_TOKEN: FieldDef = FieldDef::new("refresh_token", FieldKind::Text)
    .nullable()
    .unique()
    .secret();
pub const LAST_LOGIN: FieldDef = FieldDef::new("last_login", FieldKind::Timestamp).nullable();

pub static USER_SCHEMA: EntitySchema = EntitySchema {
    entity: "User",
    table: "users",
    fields: &[
        ID,
        FIRST_NAME,
        LAST_NAME,
        USERNAME,
        PASSWORD,
        EMAIL,
        MOBILE,
        ROLE,
        BLOCKED,
        REFRESH_TOKEN,
        LAST_LOGIN,
        CREATED_AT,
        UPDATED_AT,
    ],
};

/// A user account. The password hash and refresh token never serialize.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct User {
    pub id: EntityId,
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    #[serde(skip)]
    pub password: String,
    pub email: String,
    pub mobile: String,
    pub role: Role,
    pub blocked: bool,
    #[serde(skip)]
    pub refresh_token: Option<String>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Identity carried in access tokens.
    pub fn auth_user(&self) -> AuthUser {
        AuthUser {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
        }
    }
}

impl Entity for User {
    fn schema() -> &'static EntitySchema {
        &USER_SCHEMA
    }

    fn id(&self) -> EntityId {
        self.id
    }

    fn to_record(&self) -> Record {
        Record::new()
            .with(&ID, self.id)
            .with(&FIRST_NAME, self.first_name.as_str())
            .with(&LAST_NAME, self.last_name.as_str())
            .with(&USERNAME, self.username.as_str())
            .with(&PASSWORD, self.password.as_str())
            .with(&EMAIL, self.email.as_str())
            .with(&MOBILE, self.mobile.as_str())
            .with(&ROLE, self.role.as_str())
            .with(&BLOCKED, self.blocked)
            .with(&REFRESH_TOKEN, self.refresh_token.clone())
            .with(&LAST_LOGIN, self.last_login)
            .with(&CREATED_AT, self.created_at)
            .with(&UPDATED_AT, self.updated_at)
    }

    fn from_record(mut record: Record) -> Result<Self, DecodeError> {
        let role = record.take_text(&ROLE)?;
        Ok(Self {
            id: record.take_id(&ID)?,
            first_name: record.take_text(&FIRST_NAME)?,
            last_name: record.take_text(&LAST_NAME)?,
            username: record.take_text(&USERNAME)?,
            password: record.take_text(&PASSWORD)?,
            email: record.take_text(&EMAIL)?,
            mobile: record.take_text(&MOBILE)?,
            role: role.parse::<Role>().map_err(|_| DecodeError::InvalidValue {
                field: ROLE.name,
                value: role.clone(),
            })?,
            blocked: record.take_bool(&BLOCKED)?,
            refresh_token: record.take_opt_text(&REFRESH_TOKEN)?,
            last_login: record.take_opt_timestamp(&LAST_LOGIN)?,
            created_at: record.take_timestamp(&CREATED_AT)?,
            updated_at: record.take_timestamp(&UPDATED_AT)?,
        })
    }
}

pub fn by_username(username: &str) -> Filter {
    Filter::new().eq(&USERNAME, username)
}

pub fn by_refresh_token(token: &str) -> Filter {
    Filter::new().eq(&REFRESH_TOKEN, token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adminhub_core::Value;

    fn sample() -> User {
        User {
            id: EntityId::new(3),
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            username: "ada".into(),
            password: "$argon2id$hash".into(),
            email: "ada@example.com".into(),
            mobile: "+441234567890".into(),
            role: Role::Admin,
            blocked: false,
            refresh_token: None,
            last_login: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn record_mapping_is_lossless() {
        let user = sample();
        assert_eq!(User::from_record(user.to_record()).unwrap(), user);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let json = serde_json::to_value(sample()).unwrap();
        assert!(json.get("password").is_none());
        assert!(json.get("refresh_token").is_none());
        assert_eq!(json["role"], "admin");
    }

    #[test]
    fn unknown_stored_role_fails_decode() {
        let mut record = sample().to_record();
        record.set(ROLE.name, Value::from("root"));
        assert!(matches!(
            User::from_record(record),
            Err(DecodeError::InvalidValue { field: "role", .. })
        ));
    }

    #[test]
    fn secret_fields_are_hidden_from_request_queries() {
        assert!(!USER_SCHEMA.field("password").unwrap().filterable);
        assert!(!USER_SCHEMA.field("refresh_token").unwrap().sortable);
        assert!(USER_SCHEMA.field("username").unwrap().unique);
    }
}
