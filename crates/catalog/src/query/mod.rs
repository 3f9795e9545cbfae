//! Catalog query module.
//!
//! This module provides:
//! - CatalogQueryBuilder: FilterState to Query translation
//! - Types: Query, QueryClause, Condition, FilterOperator, etc.

mod builder;
pub mod types;

pub use builder::{CatalogQueryBuilder, DEFAULT_RESULT_LIMIT, SEARCH_FIELDS};
pub use types::{
    Condition, FilterOperator, FilterValue, Query, QueryClause, QuerySort, SortDirection,
};
