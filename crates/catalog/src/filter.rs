//! Client-side filter state for a catalog view.
//!
//! A [`FilterState`] maps each [`FilterKey`] to a string value. An absent or
//! blank value means "no constraint" for that key. `sort` is special: it is
//! never empty and falls back to [`DEFAULT_SORT`].

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Sort applied when none is selected.
pub const DEFAULT_SORT: &str = "name";

/// The fixed set of filter keys a catalog view understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKey {
    Search,
    Category,
    Author,
    Availability,
    Sort,
}

impl FilterKey {
    /// All keys, in clause emission order.
    pub const ALL: [FilterKey; 5] = [
        FilterKey::Search,
        FilterKey::Category,
        FilterKey::Author,
        FilterKey::Availability,
        FilterKey::Sort,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterKey::Search => "search",
            FilterKey::Category => "category",
            FilterKey::Author => "author",
            FilterKey::Availability => "availability",
            FilterKey::Sort => "sort",
        }
    }

    /// Name of the URL query parameter carrying this key.
    pub fn url_param(self) -> &'static str {
        match self {
            FilterKey::Sort => "order",
            other => other.as_str(),
        }
    }

    /// Resolve a URL query parameter name back to a key.
    pub fn from_url_param(param: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|key| key.url_param() == param)
    }
}

impl fmt::Display for FilterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Current user-chosen constraints for one catalog view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterState {
    values: BTreeMap<FilterKey, String>,
}

impl Default for FilterState {
    fn default() -> Self {
        let mut values = BTreeMap::new();
        values.insert(FilterKey::Sort, DEFAULT_SORT.to_string());
        Self { values }
    }
}

impl FilterState {
    /// Create a filter state with every key at its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value for a key, `None` when unconstrained.
    pub fn get(&self, key: FilterKey) -> Option<&str> {
        self.values.get(&key).map(String::as_str)
    }

    /// Set a value. Blank values clear the key.
    pub fn set(&mut self, key: FilterKey, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.clear(key);
        } else {
            self.values.insert(key, value);
        }
    }

    /// Builder-style [`FilterState::set`].
    pub fn with(mut self, key: FilterKey, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Remove the constraint for a key. Clearing `sort` restores the default.
    pub fn clear(&mut self, key: FilterKey) {
        if key == FilterKey::Sort {
            self.values.insert(key, DEFAULT_SORT.to_string());
        } else {
            self.values.remove(&key);
        }
    }

    /// Restore every key to its default.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whether the key currently constrains results.
    pub fn is_active(&self, key: FilterKey) -> bool {
        self.get(key).is_some_and(|v| !v.trim().is_empty())
    }

    /// Number of active constraints, not counting the sort order.
    pub fn active_count(&self) -> usize {
        FilterKey::ALL
            .into_iter()
            .filter(|key| *key != FilterKey::Sort && self.is_active(*key))
            .count()
    }

    /// The selected sort order.
    pub fn sort_key(&self) -> SortKey {
        self.get(FilterKey::Sort)
            .map(SortKey::parse)
            .unwrap_or_default()
    }

    /// Iterate over keys that currently hold a value.
    pub fn iter(&self) -> impl Iterator<Item = (FilterKey, &str)> {
        self.values.iter().map(|(k, v)| (*k, v.as_str()))
    }
}

/// Sort orders offered by the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    NameAsc,
    NameDesc,
    DateAsc,
    DateDesc,
    AuthorAsc,
    AuthorDesc,
}

impl SortKey {
    /// Parse a sort value. Unknown values fall back to [`SortKey::NameAsc`].
    pub fn parse(raw: &str) -> Self {
        match raw.trim() {
            "name" | "name_asc" => SortKey::NameAsc,
            "name_desc" => SortKey::NameDesc,
            "date_asc" => SortKey::DateAsc,
            "date_desc" => SortKey::DateDesc,
            "author_asc" => SortKey::AuthorAsc,
            "author_desc" => SortKey::AuthorDesc,
            other => {
                tracing::debug!(sort = other, "unknown sort order, using default");
                SortKey::NameAsc
            }
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::NameAsc => "name_asc",
            SortKey::NameDesc => "name_desc",
            SortKey::DateAsc => "date_asc",
            SortKey::DateDesc => "date_desc",
            SortKey::AuthorAsc => "author_asc",
            SortKey::AuthorDesc => "author_desc",
        }
    }
}
