//! Postgres storage backend.
//!
//! Statements are assembled with `sqlx::QueryBuilder`: identifiers come from
//! the static entity schema (quoted), every value is a bind parameter.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StorageError |
//! |------------|----------------------|--------------|
//! | Database (unique violation) | `23505` | `UniqueViolation` |
//! | Database (other) | Any other | `Backend` |
//! | PoolClosed / network / other | N/A | `Backend` |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use tracing::instrument;

use adminhub_core::{EntitySchema, FieldKind, Record, Value};

use crate::query::{Condition, Direction, Operator, OrderBy, Predicate};

use super::storage::{Selection, Storage, StorageError};

/// `Storage` over a shared sqlx pool.
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
    log_statements: bool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            log_statements: false,
        }
    }

    /// Log every statement at debug level.
    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    fn trace(&self, qb: &QueryBuilder<'_, Postgres>) {
        if self.log_statements {
            tracing::debug!(sql = qb.sql(), "executing statement");
        }
    }
}

fn push_ident(qb: &mut QueryBuilder<'_, Postgres>, ident: &str) {
    qb.push("\"").push(ident).push("\"");
}

fn push_value(qb: &mut QueryBuilder<'_, Postgres>, value: &Value) {
    match value {
        Value::Null => {
            qb.push("NULL");
        }
        Value::Bool(v) => {
            qb.push_bind(*v);
        }
        Value::Int(v) => {
            qb.push_bind(*v);
        }
        Value::Text(v) => {
            qb.push_bind(v.clone());
        }
        Value::Timestamp(v) => {
            qb.push_bind(*v);
        }
    }
}

fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('%');
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('%');
    out
}

fn push_condition(qb: &mut QueryBuilder<'_, Postgres>, cond: &Condition) {
    push_ident(qb, cond.field);
    match (cond.op, &cond.value) {
        (Operator::Exact, Value::Null) => {
            qb.push(" IS NULL");
        }
        (Operator::NotExact, Value::Null) => {
            qb.push(" IS NOT NULL");
        }
        (Operator::Exact, v) => {
            qb.push(" = ");
            push_value(qb, v);
        }
        (Operator::NotExact, v) => {
            qb.push(" IS DISTINCT FROM ");
            push_value(qb, v);
        }
        (Operator::Contains | Operator::IContains, Value::Text(needle)) => {
            qb.push(if cond.op == Operator::Contains {
                " LIKE "
            } else {
                " ILIKE "
            });
            qb.push_bind(escape_like(needle));
        }
        (Operator::Contains | Operator::IContains, _) => {
            // Only text can contain; keep the statement valid and match nothing.
            qb.push(" IS NULL AND FALSE");
        }
        (op, v) => {
            qb.push(match op {
                Operator::Gt => " > ",
                Operator::Gte => " >= ",
                Operator::Lt => " < ",
                _ => " <= ",
            });
            push_value(qb, v);
        }
    }
}

fn push_predicate(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    match predicate {
        Predicate::Always => {
            qb.push("TRUE");
        }
        Predicate::Compare(cond) => push_condition(qb, cond),
        Predicate::And(parts) if parts.is_empty() => {
            qb.push("TRUE");
        }
        Predicate::And(parts) => {
            qb.push("(");
            for (i, part) in parts.iter().enumerate() {
                if i > 0 {
                    qb.push(" AND ");
                }
                push_predicate(qb, part);
            }
            qb.push(")");
        }
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, predicate: &Predicate) {
    qb.push(" WHERE ");
    push_predicate(qb, predicate);
}

fn push_order(qb: &mut QueryBuilder<'_, Postgres>, order: &[OrderBy]) {
    for (i, key) in order.iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        push_ident(qb, key.field);
        qb.push(match key.direction {
            Direction::Asc => " ASC",
            Direction::Desc => " DESC",
        });
    }
}

fn push_columns(qb: &mut QueryBuilder<'_, Postgres>, schema: &EntitySchema) {
    for (i, field) in schema.fields.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_ident(qb, field.name);
    }
}

fn decode_row(schema: &EntitySchema, row: &PgRow) -> Result<Record, StorageError> {
    let mut record = Record::new();
    for field in schema.fields {
        let value = match field.kind {
            FieldKind::Int => row.try_get::<Option<i64>, _>(field.name).map(Value::from),
            FieldKind::Text => row.try_get::<Option<String>, _>(field.name).map(Value::from),
            FieldKind::Bool => row.try_get::<Option<bool>, _>(field.name).map(Value::from),
            FieldKind::Timestamp => row
                .try_get::<Option<DateTime<Utc>>, _>(field.name)
                .map(Value::from),
        }
        .map_err(|e| StorageError::Backend(format!("decode column '{}': {e}", field.name)))?;
        record.set(field.name, value);
    }
    Ok(record)
}

#[async_trait]
impl Storage for PgStorage {
    #[instrument(skip(self, record), fields(table = schema.table, operation = "insert"), err)]
    async fn insert(
        &self,
        schema: &'static EntitySchema,
        record: Record,
    ) -> Result<Record, StorageError> {
        let fields: Vec<_> = schema
            .insertable()
            .filter(|f| record.get(f.name).is_some())
            .collect();

        let mut qb = QueryBuilder::<Postgres>::new("INSERT INTO ");
        push_ident(&mut qb, schema.table);
        qb.push(" (");
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_ident(&mut qb, field.name);
        }
        qb.push(") VALUES (");
        for (i, field) in fields.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_value(&mut qb, record.get(field.name).unwrap_or(&Value::Null));
        }
        qb.push(") RETURNING ");
        push_columns(&mut qb, schema);

        self.trace(&qb);
        let row = qb
            .build()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(schema, "insert", e))?;
        decode_row(schema, &row)
    }

    #[instrument(skip(self, selection), fields(table = schema.table, operation = "select"), err)]
    async fn select(
        &self,
        schema: &'static EntitySchema,
        selection: &Selection,
    ) -> Result<Vec<Record>, StorageError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        push_columns(&mut qb, schema);
        qb.push(" FROM ");
        push_ident(&mut qb, schema.table);
        push_where(&mut qb, &selection.predicate);
        push_order(&mut qb, &selection.order);
        if let Some(limit) = selection.limit {
            qb.push(" LIMIT ").push_bind(clamp_i64(limit));
        }
        if selection.offset > 0 {
            qb.push(" OFFSET ").push_bind(clamp_i64(selection.offset));
        }

        self.trace(&qb);
        let rows = qb
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(schema, "select", e))?;
        rows.iter().map(|row| decode_row(schema, row)).collect()
    }

    #[instrument(skip(self, predicate), fields(table = schema.table, operation = "count"), err)]
    async fn count(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, StorageError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM ");
        push_ident(&mut qb, schema.table);
        push_where(&mut qb, predicate);

        self.trace(&qb);
        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(schema, "count", e))?;
        Ok(count.max(0) as u64)
    }

    #[instrument(skip(self, predicate, changes), fields(table = schema.table, operation = "update"), err)]
    async fn update(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
        changes: &Record,
    ) -> Result<u64, StorageError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE ");
        push_ident(&mut qb, schema.table);
        qb.push(" SET ");
        for (i, (name, value)) in changes.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            push_ident(&mut qb, name);
            qb.push(" = ");
            push_value(&mut qb, value);
        }
        push_where(&mut qb, predicate);

        self.trace(&qb);
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(schema, "update", e))?;
        Ok(result.rows_affected())
    }

    #[instrument(skip(self, predicate), fields(table = schema.table, operation = "delete"), err)]
    async fn delete(
        &self,
        schema: &'static EntitySchema,
        predicate: &Predicate,
    ) -> Result<u64, StorageError> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM ");
        push_ident(&mut qb, schema.table);
        push_where(&mut qb, predicate);

        self.trace(&qb);
        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(schema, "delete", e))?;
        Ok(result.rows_affected())
    }
}

fn clamp_i64(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

fn map_sqlx_error(schema: &EntitySchema, operation: &str, err: sqlx::Error) -> StorageError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                return StorageError::UniqueViolation {
                    table: schema.table.to_string(),
                    constraint: db_err.constraint().unwrap_or("unknown").to_string(),
                };
            }
            StorageError::Backend(format!(
                "database error in {} on {}: {}",
                operation,
                schema.table,
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => {
            StorageError::Backend(format!("connection pool closed in {operation}"))
        }
        other => StorageError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
