//! Catalog query types.
//!
//! A [`Query`] is the immutable value handed to a catalog source:
//! - QueryClause: one condition, or an OR-group of conditions
//! - Condition: field path, operator, value
//! - QuerySort: ordering key and direction

use serde::{Deserialize, Serialize};

/// Structured query sent to the catalog source.
///
/// Top-level clauses combine with logical AND.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Filter clauses, in emission order.
    #[serde(default)]
    pub clauses: Vec<QueryClause>,

    /// Result ordering.
    #[serde(default)]
    pub sort: QuerySort,

    /// Maximum number of records to return.
    pub limit: u32,
}

impl Query {
    /// Whether the query constrains results at all.
    pub fn is_unfiltered(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// One top-level clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryClause {
    /// A single condition.
    Condition(Condition),
    /// Matches when any of the conditions match.
    AnyOf(Vec<Condition>),
}

impl QueryClause {
    /// All conditions inside this clause.
    pub fn conditions(&self) -> &[Condition] {
        match self {
            QueryClause::Condition(cond) => std::slice::from_ref(cond),
            QueryClause::AnyOf(conds) => conds,
        }
    }
}

/// Field/operator/value triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    /// Field path. Dots traverse relations: "author_ids.name".
    pub field: String,

    /// Comparison operator.
    pub operator: FilterOperator,

    /// Value to compare against.
    pub value: FilterValue,
}

impl Condition {
    pub fn new(field: impl Into<String>, operator: FilterOperator, value: FilterValue) -> Self {
        Self {
            field: field.into(),
            operator,
            value,
        }
    }
}

/// Comparison operators for filtering.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    /// Exact match. On list-valued fields, membership.
    Equals,
    /// Case-insensitive substring match (ILIKE %value%).
    Contains,
}

/// Filter value types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FilterValue {
    /// Integer value (record ids).
    Integer(i64),
    /// String value.
    String(String),
}

impl FilterValue {
    /// Convert to string representation.
    pub fn as_string(&self) -> String {
        match self {
            FilterValue::Integer(i) => i.to_string(),
            FilterValue::String(s) => s.clone(),
        }
    }

    /// Convert to integer if possible.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FilterValue::Integer(i) => Some(*i),
            FilterValue::String(s) => s.parse().ok(),
        }
    }
}

/// Sort specification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuerySort {
    /// Field to sort by.
    pub field: String,

    /// Sort direction.
    #[serde(default)]
    pub direction: SortDirection,

    /// Ascending tie-break field applied after `field`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub then_by: Option<String>,
}

impl QuerySort {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
            then_by: None,
        }
    }

    /// Break ties on `field` ascending.
    pub fn then_by(mut self, field: impl Into<String>) -> Self {
        self.then_by = Some(field.into());
        self
    }

    /// Render as "field asc" / "field desc", followed by ", then_by" when set.
    pub fn to_order_string(&self) -> String {
        match &self.then_by {
            Some(then_by) => format!("{} {}, {then_by}", self.field, self.direction.as_str()),
            None => format!("{} {}", self.field, self.direction.as_str()),
        }
    }
}

impl Default for QuerySort {
    fn default() -> Self {
        Self::new("name", SortDirection::Asc)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn filter_value_conversions() {
        let str_val = FilterValue::String("12".to_string());
        assert_eq!(str_val.as_i64(), Some(12));
        assert_eq!(str_val.as_string(), "12");

        let int_val = FilterValue::Integer(42);
        assert_eq!(int_val.as_i64(), Some(42));
        assert_eq!(int_val.as_string(), "42");

        assert_eq!(FilterValue::String("tolkien".to_string()).as_i64(), None);
    }

    #[test]
    fn filter_operator_serialization() {
        let json = serde_json::to_string(&FilterOperator::Contains).unwrap();
        assert_eq!(json, "\"contains\"");

        let parsed: FilterOperator = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, FilterOperator::Contains);
    }

    #[test]
    fn sort_defaults_to_name_ascending() {
        let sort = QuerySort::default();
        assert_eq!(sort.to_order_string(), "name asc");
    }

    #[test]
    fn tie_break_is_rendered_after_primary_key() {
        let sort = QuerySort::new("registration_date", SortDirection::Desc).then_by("name");
        assert_eq!(sort.to_order_string(), "registration_date desc, name");

        let json = serde_json::to_string(&QuerySort::default()).unwrap();
        assert!(!json.contains("then_by"));
    }

    #[test]
    fn clause_conditions() {
        let single = QueryClause::Condition(Condition::new(
            "category_id",
            FilterOperator::Equals,
            FilterValue::Integer(3),
        ));
        assert_eq!(single.conditions().len(), 1);

        let group = QueryClause::AnyOf(vec![
            Condition::new("name", FilterOperator::Contains, FilterValue::String("a".into())),
            Condition::new("keywords", FilterOperator::Contains, FilterValue::String("a".into())),
        ]);
        assert_eq!(group.conditions().len(), 2);
    }

    #[test]
    fn query_serialization() {
        let query = Query {
            clauses: vec![QueryClause::Condition(Condition::new(
                "availability",
                FilterOperator::Equals,
                FilterValue::String("available".to_string()),
            ))],
            sort: QuerySort::new("registration_date", SortDirection::Desc),
            limit: 50,
        };

        let json = serde_json::to_string(&query).unwrap();
        let parsed: Query = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, query);
        assert!(!parsed.is_unfiltered());
    }
}
