//! Request mapping helpers shared by the route handlers.

use adminhub_core::{DomainResult, EntityId, EntitySchema};
use adminhub_infra::ListQuery;

/// Parse a `/:id` path segment.
pub fn parse_id(raw: &str) -> DomainResult<EntityId> {
    raw.parse()
}

/// Build a list query from raw query-string pairs.
pub fn list_query(schema: &EntitySchema, pairs: Vec<(String, String)>) -> DomainResult<ListQuery> {
    Ok(ListQuery::parse(schema, pairs)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adminhub_core::DomainError;
    use adminhub_users::USER_SCHEMA;

    fn pairs(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn ids_must_be_positive_integers() {
        assert_eq!(parse_id("12").unwrap(), EntityId::new(12));
        assert!(matches!(parse_id("0"), Err(DomainError::Validation { .. })));
        assert!(matches!(parse_id("abc"), Err(DomainError::Validation { .. })));
    }

    #[test]
    fn secret_fields_cannot_be_filtered() {
        let err = list_query(&USER_SCHEMA, pairs(&[("password", "x")])).unwrap_err();
        assert!(matches!(err, DomainError::Validation { field, .. } if field == "password"));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = list_query(&USER_SCHEMA, pairs(&[("username__like", "a")])).unwrap_err();
        assert!(matches!(err, DomainError::Validation { .. }));
    }

    #[test]
    fn page_maps_to_offset() {
        let query = list_query(&USER_SCHEMA, pairs(&[("page", "3"), ("limit", "10")])).unwrap();
        assert_eq!(query.pagination.offset, 20);
        assert_eq!(query.pagination.limit, 10);
    }
}
