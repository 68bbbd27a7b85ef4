//! Request-driven query descriptors: filters, list queries and partial updates.

mod changeset;
mod filter;
mod list;

pub use changeset::Changeset;
pub use filter::{Condition, Filter, Operator, Predicate};
pub use list::{
    DEFAULT_PAGE_SIZE, Direction, ListQuery, MAX_PAGE_SIZE, OrderBy, Page, Pagination,
};

use thiserror::Error;

use adminhub_core::DomainError;

/// A filter, sort, pagination or update request does not fit the schema.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("unknown filter operator in '{key}'")]
    UnknownOperator { key: String },

    #[error("operator '{op}' is not supported on field '{field}'")]
    UnsupportedOperator { field: String, op: Operator },

    #[error("invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    #[error("cannot sort by '{0}'")]
    NotSortable(String),

    #[error("field '{0}' cannot be updated")]
    ReadOnlyField(String),

    #[error("invalid '{param}': {message}")]
    InvalidPagination {
        param: &'static str,
        message: String,
    },
}

impl QueryError {
    /// Request input the error refers to.
    pub fn field(&self) -> &str {
        match self {
            QueryError::UnknownField(f)
            | QueryError::NotSortable(f)
            | QueryError::ReadOnlyField(f) => f,
            QueryError::UnknownOperator { key } => key,
            QueryError::UnsupportedOperator { field, .. } | QueryError::InvalidValue { field, .. } => {
                field
            }
            QueryError::InvalidPagination { param, .. } => param,
        }
    }
}

impl From<QueryError> for DomainError {
    fn from(err: QueryError) -> Self {
        DomainError::validation(err.field().to_string(), err.to_string())
    }
}
