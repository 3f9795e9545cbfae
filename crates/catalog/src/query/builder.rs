//! Query builder turning filter state into a catalog [`Query`].
//!
//! Building is pure and deterministic: the same [`FilterState`] always
//! yields the same query. Values that cannot be expressed (non-numeric ids,
//! unknown availability) are dropped here and never reach the source.

use super::types::{Condition, FilterOperator, FilterValue, Query, QueryClause, QuerySort, SortDirection};
use crate::filter::{FilterKey, FilterState, SortKey};

/// Default number of records requested per load.
pub const DEFAULT_RESULT_LIMIT: u32 = 50;

/// Fields matched by free-text search, combined with OR.
pub const SEARCH_FIELDS: [&str; 3] = ["name", "author_ids.name", "keywords"];

/// Availability values the catalog understands.
const AVAILABILITY_VALUES: [&str; 2] = ["available", "notavailable"];

/// Query builder for catalog views.
#[derive(Debug, Clone)]
pub struct CatalogQueryBuilder {
    limit: u32,
}

impl Default for CatalogQueryBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_RESULT_LIMIT)
    }
}

impl CatalogQueryBuilder {
    /// Create a builder requesting at most `limit` records.
    pub fn new(limit: u32) -> Self {
        Self { limit }
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    /// Build the query for the given filter state.
    pub fn build(&self, state: &FilterState) -> Query {
        let clauses = FilterKey::ALL
            .into_iter()
            .filter_map(|key| {
                let value = state.get(key)?.trim();
                if value.is_empty() {
                    return None;
                }
                self.build_clause(key, value)
            })
            .collect();

        Query {
            clauses,
            sort: sort_for(state.sort_key()),
            limit: self.limit,
        }
    }

    /// Build a single clause. `None` means "no constraint".
    fn build_clause(&self, key: FilterKey, value: &str) -> Option<QueryClause> {
        match key {
            FilterKey::Search => Some(QueryClause::AnyOf(
                SEARCH_FIELDS
                    .iter()
                    .map(|field| {
                        Condition::new(
                            *field,
                            FilterOperator::Contains,
                            FilterValue::String(value.to_string()),
                        )
                    })
                    .collect(),
            )),
            FilterKey::Category => id_clause(key, "category_id", value),
            FilterKey::Author => id_clause(key, "author_ids", value),
            FilterKey::Availability => {
                if AVAILABILITY_VALUES.contains(&value) {
                    Some(QueryClause::Condition(Condition::new(
                        "availability",
                        FilterOperator::Equals,
                        FilterValue::String(value.to_string()),
                    )))
                } else {
                    tracing::warn!(
                        filter = %key,
                        value = value,
                        "unknown availability value; dropping filter"
                    );
                    None
                }
            }
            // Sort is carried by Query::sort, never as a clause.
            FilterKey::Sort => None,
        }
    }
}

/// Equality clause on a record id. Ids must be positive integers.
fn id_clause(key: FilterKey, field: &str, value: &str) -> Option<QueryClause> {
    match value.parse::<i64>() {
        Ok(id) if id > 0 => Some(QueryClause::Condition(Condition::new(
            field,
            FilterOperator::Equals,
            FilterValue::Integer(id),
        ))),
        _ => {
            tracing::warn!(filter = %key, value = value, "malformed id filter; dropping filter");
            None
        }
    }
}

/// Date and author orders fall back to the title for equal keys.
fn sort_for(key: SortKey) -> QuerySort {
    let (field, direction) = match key {
        SortKey::NameAsc => return QuerySort::new("name", SortDirection::Asc),
        SortKey::NameDesc => return QuerySort::new("name", SortDirection::Desc),
        SortKey::DateAsc => ("registration_date", SortDirection::Asc),
        SortKey::DateDesc => ("registration_date", SortDirection::Desc),
        SortKey::AuthorAsc => ("author_names", SortDirection::Asc),
        SortKey::AuthorDesc => ("author_names", SortDirection::Desc),
    };
    QuerySort::new(field, direction).then_by("name")
}
