//! Query assembly.
//!
//! Merges a compiled [`AccessPredicate`] with caller-supplied filters, sort
//! and pagination into a [`QuerySpec`] that a persistence store can execute.
//! The caller's query map is only read, never modified.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::QueryConfig;
use crate::entity::ContentEntity;
use crate::error::{CrudError, CrudResult};
use crate::predicate::{AccessPredicate, FilterPredicate, FilterTerm, Join};

/// Raw caller query parameters, e.g. decoded from a query string.
pub type CallerQuery = Map<String, Value>;

/// Query keys that control paging and sorting rather than filtering.
pub const RESERVED_KEYS: [&str; 5] = ["limit", "page", "orderBy", "order", "offset"];

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    /// Ascending
    Asc,
    /// Descending
    Desc,
}

impl SortDirection {
    /// Parse a direction, case-insensitively.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" => Some(SortDirection::Asc),
            "desc" => Some(SortDirection::Desc),
            _ => None,
        }
    }
}

/// Explicit sort order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sort {
    /// Sorted field path
    pub field: String,
    /// Direction
    pub direction: SortDirection,
}

/// A store-agnostic, ready-to-execute query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    /// Access restriction compiled from the user's permissions
    pub access: FilterPredicate,
    /// Relation joins the access restriction relies on
    pub joins: Vec<Join>,
    /// Caller filters, all of which must hold
    pub filters: Vec<FilterTerm>,
    /// Explicit sort, `None` for the store's default order
    pub sort: Option<Sort>,
    /// Page size
    pub limit: u64,
    /// Page index
    pub page: u64,
    /// Number of matching records to skip
    pub offset: u64,
}

impl QuerySpec {
    /// The effective filter: access restriction AND every caller filter.
    pub fn filter(&self) -> FilterPredicate {
        self.filters
            .iter()
            .cloned()
            .map(FilterPredicate::Term)
            .fold(self.access.clone(), FilterPredicate::and)
    }

    /// Check if an entity satisfies the effective filter.
    pub fn matches(&self, entity: &ContentEntity) -> bool {
        self.access.matches(entity) && self.filters.iter().all(|f| f.matches(entity))
    }
}

/// Options for a single assembly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssembleOptions {
    /// Skip the access restriction entirely (internal callers only)
    pub bypass_permissions: bool,
}

impl AssembleOptions {
    /// Options that skip the access restriction.
    pub fn bypass() -> Self {
        Self {
            bypass_permissions: true,
        }
    }
}

/// Builds [`QuerySpec`]s from access predicates and caller queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryAssembler {
    config: QueryConfig,
}

impl QueryAssembler {
    /// Create an assembler with the given pagination settings.
    pub fn new(config: QueryConfig) -> Self {
        Self { config }
    }

    /// Pagination settings in use.
    pub fn config(&self) -> &QueryConfig {
        &self.config
    }

    /// Assemble a query.
    ///
    /// # Errors
    ///
    /// - [`CrudError::Unauthorized`] when access is denied and permissions
    ///   are not bypassed
    /// - [`CrudError::UnprocessableEntity`] when a paging or sort parameter is
    ///   malformed
    ///
    /// # Example
    ///
    /// ```
    /// use content_engine::predicate::{AccessPredicate, FilterPredicate};
    /// use content_engine::query::{AssembleOptions, CallerQuery, QueryAssembler};
    /// use serde_json::json;
    ///
    /// let access = AccessPredicate::Granted { predicate: FilterPredicate::True, joins: vec![] };
    /// let query: CallerQuery = serde_json::from_value(json!({ "limit": 10, "page": 2 })).unwrap();
    ///
    /// let spec = QueryAssembler::default()
    ///     .assemble(access, &query, AssembleOptions::default())
    ///     .unwrap();
    /// assert_eq!((spec.limit, spec.offset), (10, 20));
    /// ```
    pub fn assemble(
        &self,
        access: AccessPredicate,
        query: &CallerQuery,
        options: AssembleOptions,
    ) -> CrudResult<QuerySpec> {
        let (access, joins) = if options.bypass_permissions {
            (FilterPredicate::True, Vec::new())
        } else {
            match access {
                AccessPredicate::Denied => return Err(CrudError::Unauthorized),
                AccessPredicate::Granted { predicate, joins } => (predicate, joins),
            }
        };

        let sort = parse_sort(query)?;

        let (limit, page) = match parse_count(query, "limit")? {
            Some(requested) => {
                let limit = if requested > self.config.max_limit {
                    tracing::warn!(
                        requested,
                        max_limit = self.config.max_limit,
                        "Requested limit exceeds maximum, clamping"
                    );
                    self.config.max_limit
                } else {
                    requested
                };
                (limit, parse_count(query, "page")?.unwrap_or(0))
            }
            None => (self.config.default_limit.min(self.config.max_limit), 0),
        };

        let offset = match parse_count(query, "offset")? {
            Some(offset) => offset,
            None => limit.saturating_mul(page),
        };

        let filters = query
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| match value {
                Value::Array(values) => FilterTerm::one_of(key.as_str(), values.clone()),
                other => FilterTerm::eq(key.as_str(), other.clone()),
            })
            .collect();

        let spec = QuerySpec {
            access,
            joins,
            filters,
            sort,
            limit,
            page,
            offset,
        };
        tracing::debug!(
            limit = spec.limit,
            offset = spec.offset,
            filters = spec.filters.len(),
            joins = spec.joins.len(),
            "Assembled query"
        );
        Ok(spec)
    }
}

/// Read a non-negative integer parameter given as a number or a numeric string.
fn parse_count(query: &CallerQuery, key: &str) -> CrudResult<Option<u64>> {
    let parsed = match query.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::Number(n)) => n.as_u64(),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        Some(_) => None,
    };

    parsed
        .map(Some)
        .ok_or_else(|| CrudError::invalid(format!("Invalid value for query parameter `{key}`")))
}

/// Sort applies only when both the field and the direction are given.
fn parse_sort(query: &CallerQuery) -> CrudResult<Option<Sort>> {
    let field = query.get("orderBy").and_then(Value::as_str).filter(|s| !s.is_empty());
    let direction = query.get("order").and_then(Value::as_str).filter(|s| !s.is_empty());

    let (Some(field), Some(direction)) = (field, direction) else {
        return Ok(None);
    };

    let direction = SortDirection::parse(direction)
        .ok_or_else(|| CrudError::invalid("Invalid value for query parameter `order`"))?;

    Ok(Some(Sort {
        field: field.to_string(),
        direction,
    }))
}
