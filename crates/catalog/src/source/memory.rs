//! In-process catalog source.
//!
//! Evaluates queries directly against a list of JSON records. Field paths
//! traverse nested objects and arrays, so `author_ids.name` matches any
//! author's name.

use std::cmp::Ordering;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};

use super::{CatalogRecord, CatalogSource, Suggestion, title_slots};
use crate::error::CatalogResult;
use crate::query::{Condition, FilterOperator, FilterValue, Query, QueryClause, SortDirection};

/// Catalog source backed by an in-memory record list.
#[derive(Debug, Default)]
pub struct MemoryCatalogSource {
    records: RwLock<Vec<CatalogRecord>>,
}

impl MemoryCatalogSource {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Add or replace a record by id.
    pub fn upsert(&self, record: CatalogRecord) {
        let mut records = self.records.write();
        match records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => records.push(record),
        }
    }

    /// Remove a record. Returns whether it existed.
    pub fn remove(&self, id: i64) -> bool {
        let mut records = self.records.write();
        let before = records.len();
        records.retain(|r| r.id != id);
        records.len() != before
    }

    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Run a query synchronously.
    pub fn evaluate(&self, query: &Query) -> Vec<CatalogRecord> {
        let records = self.records.read();
        let mut matched: Vec<CatalogRecord> = records
            .iter()
            .filter(|record| query.clauses.iter().all(|c| clause_matches(record, c)))
            .cloned()
            .collect();
        drop(records);

        matched.sort_by(|a, b| {
            let ord = compare_values(
                first_value(&a.fields, &query.sort.field),
                first_value(&b.fields, &query.sort.field),
            );
            let ord = match query.sort.direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            };
            let ord = match &query.sort.then_by {
                Some(field) => ord.then_with(|| {
                    compare_values(first_value(&a.fields, field), first_value(&b.fields, field))
                }),
                None => ord,
            };
            ord.then(a.id.cmp(&b.id))
        });
        matched.truncate(query.limit as usize);
        matched
    }
}

#[async_trait]
impl CatalogSource for MemoryCatalogSource {
    async fn fetch(&self, query: &Query) -> CatalogResult<Vec<CatalogRecord>> {
        Ok(self.evaluate(query))
    }

    async fn suggest(&self, prefix: &str, limit: usize) -> CatalogResult<Vec<Suggestion>> {
        let needle = prefix.trim().to_lowercase();
        let matches = |name: &str| name.to_lowercase().contains(&needle);
        let records = self.records.read();

        let mut titles: Vec<Suggestion> = records
            .iter()
            .filter_map(|r| r.display_name().map(|name| Suggestion::title(r.id, name)))
            .filter(|s| matches(&s.value))
            .collect();
        titles.sort_by(|a, b| a.value.to_lowercase().cmp(&b.value.to_lowercase()));
        titles.truncate(title_slots(limit));

        let mut authors: Vec<Suggestion> = records
            .iter()
            .filter_map(|r| r.field("author_ids").and_then(Value::as_array))
            .flatten()
            .filter_map(|author| {
                let id = author.get("id")?.as_i64()?;
                let name = author.get("name")?.as_str()?;
                Some(Suggestion::author(id, name))
            })
            .filter(|s| matches(&s.value))
            .collect();
        drop(records);
        authors.sort_by(|a, b| {
            a.value
                .to_lowercase()
                .cmp(&b.value.to_lowercase())
                .then(a.id.cmp(&b.id))
        });
        authors.dedup_by_key(|s| s.id);
        authors.truncate(limit - titles.len());

        titles.extend(authors);
        Ok(titles)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

fn clause_matches(record: &CatalogRecord, clause: &QueryClause) -> bool {
    match clause {
        QueryClause::Condition(cond) => condition_matches(record, cond),
        QueryClause::AnyOf(conds) => conds.iter().any(|c| condition_matches(record, c)),
    }
}

fn condition_matches(record: &CatalogRecord, cond: &Condition) -> bool {
    let values = field_values(&record.fields, &cond.field);
    match cond.operator {
        FilterOperator::Equals => values.iter().any(|v| value_equals(v, &cond.value)),
        FilterOperator::Contains => {
            let needle = cond.value.as_string().to_lowercase();
            values
                .iter()
                .filter_map(|v| v.as_str())
                .any(|s| s.to_lowercase().contains(&needle))
        }
    }
}

/// Equality against a leaf value. Objects compare by their `id`.
fn value_equals(value: &Value, expected: &FilterValue) -> bool {
    let value = match value {
        Value::Object(obj) => match obj.get("id") {
            Some(id) => id,
            None => return false,
        },
        other => other,
    };
    match expected {
        FilterValue::Integer(i) => {
            value.as_i64() == Some(*i) || value.as_str() == Some(i.to_string().as_str())
        }
        FilterValue::String(s) => match value {
            Value::String(v) => v == s,
            Value::Number(n) => n.to_string() == *s,
            _ => false,
        },
    }
}

/// Collect the leaf values reached by a dotted path, flattening arrays.
fn field_values<'a>(fields: &'a Map<String, Value>, path: &str) -> Vec<&'a Value> {
    let mut segments = path.split('.');
    let Some(first) = segments.next() else {
        return Vec::new();
    };
    let mut current: Vec<&Value> = fields.get(first).into_iter().collect();

    for segment in segments {
        current = current
            .into_iter()
            .flat_map(|value| -> Vec<&'a Value> {
                match value {
                    Value::Array(items) => items.iter().filter_map(|i| i.get(segment)).collect(),
                    Value::Object(obj) => obj.get(segment).into_iter().collect(),
                    _ => Vec::new(),
                }
            })
            .collect();
    }

    current
        .into_iter()
        .flat_map(|value| -> Vec<&'a Value> {
            match value {
                Value::Array(items) => items.iter().collect(),
                other => vec![other],
            }
        })
        .collect()
}

fn first_value<'a>(fields: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    field_values(fields, path).into_iter().find(|v| !v.is_null())
}

/// Order two sort values; missing values sort last.
fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(a), Some(b)) => match (a.as_f64(), b.as_f64()) {
            (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
            _ => sort_text(a).cmp(&sort_text(b)),
        },
    }
}

fn sort_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.to_lowercase(),
        other => other.to_string(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::filter::{FilterKey, FilterState};
    use crate::query::CatalogQueryBuilder;
    use serde_json::json;

    fn book(id: i64, name: &str, author_id: i64, author: &str, category: i64) -> CatalogRecord {
        CatalogRecord::new(id)
            .with_field("name", name)
            .with_field("author_ids", json!([{"id": author_id, "name": author}]))
            .with_field("author_names", author)
            .with_field("keywords", "")
            .with_field("category_id", category)
            .with_field("availability", "available")
    }

    fn source() -> MemoryCatalogSource {
        MemoryCatalogSource::new(vec![
            book(1, "The Hobbit", 10, "J.R.R. Tolkien", 1),
            book(2, "Dune", 20, "Frank Herbert", 2),
            book(3, "The Silmarillion", 10, "J.R.R. Tolkien", 1),
        ])
    }

    #[test]
    fn unfiltered_query_sorts_by_name() {
        let query = CatalogQueryBuilder::default().build(&FilterState::default());
        let names: Vec<_> = source()
            .evaluate(&query)
            .iter()
            .map(|r| r.display_name().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["Dune", "The Hobbit", "The Silmarillion"]);
    }

    #[test]
    fn search_matches_author_case_insensitively() {
        let state = FilterState::new().with(FilterKey::Search, "TOLKIEN");
        let query = CatalogQueryBuilder::default().build(&state);
        let ids: Vec<i64> = source().evaluate(&query).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn equals_on_nested_ids() {
        let state = FilterState::new().with(FilterKey::Author, "20");
        let query = CatalogQueryBuilder::default().build(&state);
        let ids: Vec<i64> = source().evaluate(&query).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn filters_combine_with_and() {
        let state = FilterState::new()
            .with(FilterKey::Search, "the")
            .with(FilterKey::Category, "1")
            .with(FilterKey::Sort, "name_desc");
        let query = CatalogQueryBuilder::default().build(&state);
        let ids: Vec<i64> = source().evaluate(&query).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 1]);
    }

    #[test]
    fn limit_truncates() {
        let query = CatalogQueryBuilder::new(2).build(&FilterState::default());
        assert_eq!(source().evaluate(&query).len(), 2);
    }

    #[test]
    fn upsert_and_remove() {
        let source = source();
        source.upsert(book(2, "Dune Messiah", 20, "Frank Herbert", 2));
        assert_eq!(source.len(), 3);
        assert!(source.remove(1));
        assert!(!source.remove(1));
        assert_eq!(source.len(), 2);
    }

    #[test]
    fn equal_sort_keys_fall_back_to_name() {
        let source = source();
        source.upsert(book(4, "Beren and Luthien", 10, "J.R.R. Tolkien", 1));

        let state = FilterState::new().with(FilterKey::Sort, "author_asc");
        let query = CatalogQueryBuilder::default().build(&state);
        let ids: Vec<i64> = source.evaluate(&query).iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![2, 4, 1, 3]);
    }

    #[tokio::test]
    async fn suggest_returns_titles_then_authors() {
        let suggestions = source().suggest("t", 8).await.unwrap();
        assert_eq!(
            suggestions,
            vec![
                Suggestion::title(1, "The Hobbit"),
                Suggestion::title(3, "The Silmarillion"),
                Suggestion::author(20, "Frank Herbert"),
                Suggestion::author(10, "J.R.R. Tolkien"),
            ]
        );

        let suggestions = source().suggest("the", 1).await.unwrap();
        assert_eq!(suggestions, vec![Suggestion::title(1, "The Hobbit")]);
    }

    #[tokio::test]
    async fn author_suggestions_are_deduplicated() {
        let suggestions = source().suggest("tolkien", 8).await.unwrap();
        assert_eq!(suggestions, vec![Suggestion::author(10, "J.R.R. Tolkien")]);
    }
}
