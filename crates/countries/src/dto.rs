//! Country request payloads.
//!
//! Names are trimmed, codes uppercased and spaces removed from phone codes
//! before validation.

use serde::Deserialize;

use adminhub_core::{DomainError, DomainResult};
use adminhub_infra::Changeset;

use crate::country::{CODE, NAME, PHONE_CODE};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateCountryRequest {
    pub name: String,
    pub code: String,
    pub phone_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCountry {
    pub name: String,
    pub code: String,
    pub phone_code: String,
}

impl CreateCountryRequest {
    pub fn validate(self) -> DomainResult<NewCountry> {
        Ok(NewCountry {
            name: normalize_name(&self.name)?,
            code: normalize_code(&self.code)?,
            phone_code: normalize_phone_code(&self.phone_code)?,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCountryRequest {
    pub name: Option<String>,
    pub code: Option<String>,
    pub phone_code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
    pub phone_code: Option<String>,
}

impl UpdateCountryRequest {
    pub fn validate(self) -> DomainResult<CountryUpdate> {
        Ok(CountryUpdate {
            name: self.name.as_deref().map(normalize_name).transpose()?,
            code: self.code.as_deref().map(normalize_code).transpose()?,
            phone_code: self
                .phone_code
                .as_deref()
                .map(normalize_phone_code)
                .transpose()?,
        })
    }
}

impl CountryUpdate {
    pub fn changeset(&self) -> Changeset {
        Changeset::new()
            .set_opt(&NAME, self.name.clone())
            .set_opt(&CODE, self.code.clone())
            .set_opt(&PHONE_CODE, self.phone_code.clone())
    }
}

fn normalize_name(raw: &str) -> DomainResult<String> {
    let name = raw.trim();
    if name.chars().count() < 3 {
        return Err(DomainError::validation("name", "name must be at least 3 characters"));
    }
    Ok(name.to_string())
}

fn normalize_code(raw: &str) -> DomainResult<String> {
    let code = raw.trim().to_uppercase();
    if !(2..=10).contains(&code.chars().count()) {
        return Err(DomainError::validation("code", "code must be 2 to 10 characters"));
    }
    Ok(code)
}

fn normalize_phone_code(raw: &str) -> DomainResult<String> {
    let phone_code: String = raw.chars().filter(|c| !c.is_whitespace()).collect();
    let valid = (2..=10).contains(&phone_code.len())
        && phone_code
            .strip_prefix('+')
            .is_some_and(|digits| !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()));
    if !valid {
        return Err(DomainError::validation(
            "phone_code",
            "phone_code must be '+' followed by digits",
        ));
    }
    Ok(phone_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(err: DomainError) -> String {
        match err {
            DomainError::Validation { field, .. } => field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn create_request_is_normalized() {
        let country = CreateCountryRequest {
            name: "  Vietnam ".into(),
            code: "vn".into(),
            phone_code: "+ 84".into(),
        }
        .validate()
        .unwrap();
        assert_eq!(
            country,
            NewCountry {
                name: "Vietnam".into(),
                code: "VN".into(),
                phone_code: "+84".into(),
            }
        );
    }

    #[test]
    fn invalid_values_name_their_field() {
        let base = CreateCountryRequest {
            name: "Vietnam".into(),
            code: "VN".into(),
            phone_code: "+84".into(),
        };

        let short = CreateCountryRequest {
            name: " V ".into(),
            ..base.clone()
        };
        assert_eq!(field_of(short.validate().unwrap_err()), "name");

        let long_code = CreateCountryRequest {
            code: "ABCDEFGHIJK".into(),
            ..base.clone()
        };
        assert_eq!(field_of(long_code.validate().unwrap_err()), "code");

        for bad in ["84", "+", "+8a"] {
            let phone = CreateCountryRequest {
                phone_code: bad.into(),
                ..base.clone()
            };
            assert_eq!(field_of(phone.validate().unwrap_err()), "phone_code", "{bad}");
        }
    }

    #[test]
    fn update_only_touches_present_fields() {
        let update = UpdateCountryRequest {
            code: Some("sg".into()),
            ..Default::default()
        }
        .validate()
        .unwrap();
        assert_eq!(update.code.as_deref(), Some("SG"));

        let changes = update.changeset();
        assert_eq!(changes.len(), 1);
        assert!(changes.get("name").is_none());
    }
}
