//! List requests: filter + ordering + pagination.

use serde::Serialize;

use adminhub_core::schema::ID;
use adminhub_core::{EntitySchema, FieldDef};

use super::{Filter, QueryError};

/// Page size applied when the request does not name one.
pub const DEFAULT_PAGE_SIZE: u64 = 25;
/// Larger requested page sizes are clamped to this.
pub const MAX_PAGE_SIZE: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderBy {
    pub field: &'static str,
    pub direction: Direction,
}

impl OrderBy {
    pub fn asc(field: &FieldDef) -> Self {
        Self {
            field: field.name,
            direction: Direction::Asc,
        }
    }

    pub fn desc(field: &FieldDef) -> Self {
        Self {
            field: field.name,
            direction: Direction::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: u64,
    pub offset: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: DEFAULT_PAGE_SIZE,
            offset: 0,
        }
    }
}

impl Pagination {
    pub fn new(limit: Option<u64>, offset: Option<u64>) -> Self {
        Self {
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
            offset: offset.unwrap_or(0),
        }
    }
}

/// A filtered, ordered, paginated list request.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListQuery {
    pub filter: Filter,
    order: Vec<OrderBy>,
    pub pagination: Pagination,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    pub fn order_by(mut self, order: OrderBy) -> Self {
        self.order.push(order);
        self
    }

    pub fn paginate(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    /// Effective ordering: the requested keys followed by `id ASC` unless `id`
    /// is already present, so pages are stable.
    pub fn ordering(&self) -> Vec<OrderBy> {
        let mut order = self.order.clone();
        if !order.iter().any(|o| o.field == ID.name) {
            order.push(OrderBy::asc(&ID));
        }
        order
    }

    /// Parse flattened request pairs.
    ///
    /// Reserved keys: `limit`, `offset`, `page` (1-based, ignored when `offset`
    /// is given) and `sort` (comma separated, `-` prefix for descending).
    /// Everything else is a filter condition.
    pub fn parse<K, V>(
        schema: &EntitySchema,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, QueryError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut limit = None;
        let mut offset = None;
        let mut page = None;
        let mut order = Vec::new();
        let mut conditions = Vec::new();

        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "limit" => limit = Some(parse_positive("limit", value)?),
                "offset" => offset = Some(parse_count("offset", value)?),
                "page" => page = Some(parse_positive("page", value)?),
                "sort" => order = parse_sort(schema, value)?,
                other => conditions.push((other.to_string(), value.to_string())),
            }
        }

        let mut pagination = Pagination::new(limit, offset);
        if offset.is_none() {
            if let Some(page) = page {
                pagination.offset = (page - 1).saturating_mul(pagination.limit);
            }
        }

        Ok(Self {
            filter: Filter::parse(schema, conditions)?,
            order,
            pagination,
        })
    }
}

fn parse_count(param: &'static str, raw: &str) -> Result<u64, QueryError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| QueryError::InvalidPagination {
            param,
            message: format!("'{raw}' is not a non-negative integer"),
        })
}

fn parse_positive(param: &'static str, raw: &str) -> Result<u64, QueryError> {
    match parse_count(param, raw)? {
        0 => Err(QueryError::InvalidPagination {
            param,
            message: "must be greater than zero".into(),
        }),
        n => Ok(n),
    }
}

fn parse_sort(schema: &EntitySchema, raw: &str) -> Result<Vec<OrderBy>, QueryError> {
    let mut order = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, direction) = match part.strip_prefix('-') {
            Some(name) => (name, Direction::Desc),
            None => (part, Direction::Asc),
        };
        let field = schema
            .field(name)
            .filter(|f| f.sortable)
            .ok_or_else(|| QueryError::NotSortable(name.to_string()))?;
        order.push(OrderBy {
            field: field.name,
            direction,
        });
    }
    Ok(order)
}

/// One page of results plus the count of every row matching the filter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<E> {
    #[serde(rename = "data")]
    pub records: Vec<E>,
    pub total_count: u64,
}
