//! Request payloads and their normalized, validated forms.
//!
//! Binding trims names/email/role and strips spaces from the mobile number
//! before validating, so `" +84 912 345 678 "` is stored as `+84912345678`.

use serde::Deserialize;

use adminhub_auth::Role;
use adminhub_core::{DomainError, DomainResult};
use adminhub_infra::Changeset;

use crate::user::{BLOCKED, EMAIL, FIRST_NAME, LAST_NAME, MOBILE, ROLE};

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateUserRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub role: String,
    #[serde(default)]
    pub blocked: bool,
}

/// A validated user creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub mobile: String,
    pub role: Role,
    pub blocked: bool,
}

impl CreateUserRequest {
    pub fn validate(self) -> DomainResult<NewUser> {
        let username = self.username.trim().to_string();
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(DomainError::validation(
                "username",
                format!("username must be at least {MIN_USERNAME_LEN} characters"),
            ));
        }
        check_password("password", &self.password)?;

        Ok(NewUser {
            username,
            password: self.password,
            first_name: required("first_name", &self.first_name)?,
            last_name: required("last_name", &self.last_name)?,
            email: normalize_email(&self.email)?,
            mobile: normalize_mobile(&self.mobile)?,
            role: parse_role(&self.role)?,
            blocked: self.blocked,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub role: Option<String>,
    pub blocked: Option<bool>,
}

/// A validated partial update; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub role: Option<Role>,
    pub blocked: Option<bool>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> DomainResult<UserUpdate> {
        Ok(UserUpdate {
            first_name: self
                .first_name
                .map(|v| required("first_name", &v))
                .transpose()?,
            last_name: self
                .last_name
                .map(|v| required("last_name", &v))
                .transpose()?,
            email: self.email.map(|v| normalize_email(&v)).transpose()?,
            mobile: self.mobile.map(|v| normalize_mobile(&v)).transpose()?,
            role: self.role.map(|v| parse_role(&v)).transpose()?,
            blocked: self.blocked,
        })
    }
}

impl UserUpdate {
    pub fn changeset(&self) -> Changeset {
        Changeset::new()
            .set_opt(&FIRST_NAME, self.first_name.clone())
            .set_opt(&LAST_NAME, self.last_name.clone())
            .set_opt(&EMAIL, self.email.clone())
            .set_opt(&MOBILE, self.mobile.clone())
            .set_opt(&ROLE, self.role.map(|r| r.as_str()))
            .set_opt(&BLOCKED, self.blocked)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChangeRequest {
    pub old_password: String,
    pub new_password: String,
    pub new_password_confirm: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordChange {
    pub old_password: String,
    pub new_password: String,
}

impl PasswordChangeRequest {
    pub fn validate(self) -> DomainResult<PasswordChange> {
        if self.old_password.is_empty() {
            return Err(DomainError::validation("old_password", "old_password is required"));
        }
        check_password("new_password", &self.new_password)?;
        if self.new_password != self.new_password_confirm {
            return Err(DomainError::validation(
                "new_password_confirm",
                "new_password_confirm must match new_password",
            ));
        }
        Ok(PasswordChange {
            old_password: self.old_password,
            new_password: self.new_password,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

fn required(field: &'static str, raw: &str) -> DomainResult<String> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(DomainError::validation(field, format!("{field} is required")));
    }
    Ok(value.to_string())
}

fn check_password(field: &'static str, password: &str) -> DomainResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(DomainError::validation(
            field,
            format!("{field} must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

fn normalize_email(raw: &str) -> DomainResult<String> {
    let email = raw.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(DomainError::validation("email", "email is not a valid address"));
    }
    Ok(email.to_string())
}

/// Optional leading `+`, then 8 to 15 digits.
fn normalize_mobile(raw: &str) -> DomainResult<String> {
    let mobile: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let digits = mobile.strip_prefix('+').unwrap_or(&mobile);
    let valid = (8..=15).contains(&digits.len()) && digits.chars().all(|c| c.is_ascii_digit());
    if !valid {
        return Err(DomainError::validation("mobile", "mobile is not a valid phone number"));
    }
    Ok(mobile)
}

fn parse_role(raw: &str) -> DomainResult<Role> {
    raw.trim()
        .parse::<Role>()
        .map_err(|e| DomainError::validation("role", e.to_string()))
}
