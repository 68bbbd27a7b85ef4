//! Filter conditions and the backend-neutral predicate tree.
//!
//! Request filters arrive as flattened key/value pairs (`name=Kenya`,
//! `id__notexact=3`, `created_at__gte=2024-01-01T00:00:00Z`). Keys are split on
//! the last `__` into a field name and an operator suffix; an unsuffixed key
//! means equality. Every field is checked against the entity schema, so an
//! unknown or hidden field fails instead of being dropped.

use chrono::{DateTime, Utc};

use adminhub_core::{EntitySchema, FieldDef, FieldKind, Record, Value};

use super::QueryError;

/// Comparison operator of a single condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Exact,
    NotExact,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    IContains,
}

impl Operator {
    pub const ALL: [Operator; 8] = [
        Operator::Exact,
        Operator::NotExact,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
        Operator::Contains,
        Operator::IContains,
    ];

    /// Key suffix (without the `__` separator).
    pub fn suffix(&self) -> &'static str {
        match self {
            Operator::Exact => "exact",
            Operator::NotExact => "notexact",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
            Operator::Contains => "contains",
            Operator::IContains => "icontains",
        }
    }

    pub fn from_suffix(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.suffix() == suffix)
    }

    /// Whether the operator can be applied to a field of `kind`.
    pub fn applies_to(&self, kind: FieldKind) -> bool {
        match self {
            Operator::Exact | Operator::NotExact => true,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => kind != FieldKind::Bool,
            Operator::Contains | Operator::IContains => kind == FieldKind::Text,
        }
    }
}

impl core::fmt::Display for Operator {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.suffix())
    }
}

/// One `(field, operator, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: &'static str,
    pub op: Operator,
    pub value: Value,
}

impl Condition {
    /// Evaluate against a stored record. Comparisons other than (in)equality
    /// never match a `Null` column, mirroring SQL.
    pub fn matches(&self, record: &Record) -> bool {
        let actual = record.get(self.field).unwrap_or(&Value::Null);
        match self.op {
            Operator::Exact => actual == &self.value,
            Operator::NotExact => actual != &self.value,
            Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
                if actual.is_null() || self.value.is_null() {
                    return false;
                }
                let Some(ord) = actual.compare(&self.value) else {
                    return false;
                };
                match self.op {
                    Operator::Gt => ord.is_gt(),
                    Operator::Gte => ord.is_ge(),
                    Operator::Lt => ord.is_lt(),
                    _ => ord.is_le(),
                }
            }
            Operator::Contains | Operator::IContains => match (actual, &self.value) {
                (Value::Text(haystack), Value::Text(needle)) => {
                    if self.op == Operator::Contains {
                        haystack.contains(needle.as_str())
                    } else {
                        haystack.to_lowercase().contains(&needle.to_lowercase())
                    }
                }
                _ => false,
            },
        }
    }
}

/// Backend-neutral predicate tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Matches every row.
    Always,
    Compare(Condition),
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::Always => true,
            Predicate::Compare(c) => c.matches(record),
            Predicate::And(parts) => parts.iter().all(|p| p.matches(record)),
        }
    }

    /// Field names referenced anywhere in the tree.
    pub fn fields(&self) -> Vec<&'static str> {
        match self {
            Predicate::Always => Vec::new(),
            Predicate::Compare(c) => vec![c.field],
            Predicate::And(parts) => parts.iter().flat_map(Predicate::fields).collect(),
        }
    }
}

/// An ordered conjunction of conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Vec<Condition>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a condition on a known field. Programmatic filters may reference
    /// secret fields (e.g. a refresh-token lookup); request input may not.
    pub fn push(mut self, field: &FieldDef, op: Operator, value: impl Into<Value>) -> Self {
        self.conditions.push(Condition {
            field: field.name,
            op,
            value: value.into(),
        });
        self
    }

    pub fn eq(self, field: &FieldDef, value: impl Into<Value>) -> Self {
        self.push(field, Operator::Exact, value)
    }

    pub fn not_exact(self, field: &FieldDef, value: impl Into<Value>) -> Self {
        self.push(field, Operator::NotExact, value)
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn predicate(&self) -> Predicate {
        match self.conditions.len() {
            0 => Predicate::Always,
            1 => Predicate::Compare(self.conditions[0].clone()),
            _ => Predicate::And(
                self.conditions
                    .iter()
                    .cloned()
                    .map(Predicate::Compare)
                    .collect(),
            ),
        }
    }

    /// Parse request filter pairs against `schema`.
    pub fn parse<K, V>(
        schema: &EntitySchema,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, QueryError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut filter = Filter::new();
        for (key, raw) in pairs {
            let key = key.as_ref();
            let (name, op) = split_key(key)?;

            let field = schema
                .field(name)
                .filter(|f| f.filterable)
                .ok_or_else(|| QueryError::UnknownField(name.to_string()))?;

            if !op.applies_to(field.kind) {
                return Err(QueryError::UnsupportedOperator {
                    field: field.name.to_string(),
                    op,
                });
            }

            let value = parse_value(field, raw.as_ref())?;
            filter = filter.push(field, op, value);
        }
        Ok(filter)
    }
}

fn split_key(key: &str) -> Result<(&str, Operator), QueryError> {
    match key.rsplit_once("__") {
        None => Ok((key, Operator::Exact)),
        Some((name, suffix)) => {
            let op = Operator::from_suffix(suffix).ok_or_else(|| QueryError::UnknownOperator {
                key: key.to_string(),
            })?;
            Ok((name, op))
        }
    }
}

/// Parse a raw request value according to the field kind.
fn parse_value(field: &FieldDef, raw: &str) -> Result<Value, QueryError> {
    let invalid = |message: String| QueryError::InvalidValue {
        field: field.name.to_string(),
        message,
    };

    match field.kind {
        FieldKind::Text => Ok(Value::Text(raw.to_string())),
        FieldKind::Int => raw
            .trim()
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| invalid(format!("'{raw}' is not an integer"))),
        FieldKind::Bool => match raw.trim() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid(format!("'{raw}' is not a boolean"))),
        },
        FieldKind::Timestamp => DateTime::parse_from_rfc3339(raw.trim())
            .map(|t| Value::Timestamp(t.with_timezone(&Utc)))
            .map_err(|_| invalid(format!("'{raw}' is not an RFC 3339 timestamp"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use adminhub_core::schema::{CREATED_AT, ID};

    const NAME: FieldDef = FieldDef::new("name", FieldKind::Text).unique();
    const ACTIVE: FieldDef = FieldDef::new("active", FieldKind::Bool);
    const TOKEN: FieldDef = FieldDef::new("token", FieldKind::Text).secret();

    static SCHEMA: EntitySchema = EntitySchema {
        entity: "Thing",
        table: "things",
        fields: &[ID, NAME, ACTIVE, TOKEN, CREATED_AT],
    };

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn unsuffixed_key_is_equality() {
        let filter = Filter::parse(&SCHEMA, pairs(&[("name", "Kenya")])).unwrap();
        assert_eq!(
            filter.conditions(),
            &[Condition {
                field: "name",
                op: Operator::Exact,
                value: Value::from("Kenya"),
            }]
        );
    }

    #[test]
    fn notexact_suffix_parses_typed_value() {
        let filter = Filter::parse(&SCHEMA, pairs(&[("id__notexact", "3")])).unwrap();
        assert_eq!(filter.conditions()[0].op, Operator::NotExact);
        assert_eq!(filter.conditions()[0].value, Value::Int(3));
    }

    #[test]
    fn unknown_field_is_rejected() {
        let err = Filter::parse(&SCHEMA, pairs(&[("nmae", "x")])).unwrap_err();
        assert_eq!(err, QueryError::UnknownField("nmae".into()));
    }

    #[test]
    fn secret_field_is_indistinguishable_from_unknown() {
        let err = Filter::parse(&SCHEMA, pairs(&[("token", "x")])).unwrap_err();
        assert_eq!(err, QueryError::UnknownField("token".into()));
    }

    #[test]
    fn unknown_operator_is_rejected() {
        let err = Filter::parse(&SCHEMA, pairs(&[("name__like", "x")])).unwrap_err();
        assert!(matches!(err, QueryError::UnknownOperator { .. }));
    }

    #[test]
    fn operator_must_fit_field_kind() {
        assert!(matches!(
            Filter::parse(&SCHEMA, pairs(&[("active__gt", "true")])),
            Err(QueryError::UnsupportedOperator { .. })
        ));
        assert!(matches!(
            Filter::parse(&SCHEMA, pairs(&[("id__contains", "1")])),
            Err(QueryError::UnsupportedOperator { .. })
        ));
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert!(matches!(
            Filter::parse(&SCHEMA, pairs(&[("id", "abc")])),
            Err(QueryError::InvalidValue { .. })
        ));
        assert!(matches!(
            Filter::parse(&SCHEMA, pairs(&[("created_at__gte", "yesterday")])),
            Err(QueryError::InvalidValue { .. })
        ));
    }

    #[test]
    fn predicate_evaluates_like_sql() {
        let record = Record::new()
            .with(&ID, 5i64)
            .with(&NAME, "Kenya")
            .with(&ACTIVE, true)
            .with(&CREATED_AT, Value::Null);

        let filter = Filter::new()
            .push(&NAME, Operator::IContains, "ENY")
            .push(&ID, Operator::Gte, 5i64)
            .not_exact(&ID, 6i64);
        assert!(filter.predicate().matches(&record));

        let on_null = Filter::new().push(&CREATED_AT, Operator::Lt, Utc::now());
        assert!(!on_null.predicate().matches(&record));

        assert!(!Filter::new().push(&NAME, Operator::Contains, "eny!").predicate().matches(&record));
        assert!(Filter::new().predicate().matches(&record));
    }
}
