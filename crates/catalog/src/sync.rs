//! Synchronization between filter state, URL parameters, and UI controls.
//!
//! URL parameters use plain form encoding with the names `search`,
//! `category`, `author`, `availability` and `order` (for the sort key).

use serde::Serialize;
use url::form_urlencoded;

use crate::filter::{FilterKey, FilterState, SortKey};

impl FilterState {
    /// Seed a filter state from a URL query string.
    ///
    /// A leading `?` is accepted. Unknown parameters are ignored; a missing
    /// `order` keeps the default sort.
    pub fn from_query_string(query: &str) -> Self {
        let query = query.strip_prefix('?').unwrap_or(query);
        let mut state = FilterState::default();
        for (param, value) in form_urlencoded::parse(query.as_bytes()) {
            match FilterKey::from_url_param(&param) {
                Some(key) => state.set(key, value.into_owned()),
                None => tracing::trace!(param = %param, "ignoring unknown URL parameter"),
            }
        }
        state
    }

    /// Write the filter state back as a URL query string.
    ///
    /// Only keys with a value are written, in fixed key order.
    pub fn to_query_string(&self) -> String {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for key in FilterKey::ALL {
            if let Some(value) = self.get(key).filter(|v| !v.trim().is_empty()) {
                serializer.append_pair(key.url_param(), value);
            }
        }
        serializer.finish()
    }
}

/// UI state for a single filter control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterIndicator {
    pub key: FilterKey,
    pub value: Option<String>,
    pub active: bool,
}

/// What the filter controls should display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterProjection {
    /// One indicator per non-sort key, in key order.
    pub indicators: Vec<FilterIndicator>,

    /// The selected sort option.
    pub sort: SortKey,

    /// Number of active filters, not counting the sort order.
    pub badge_count: usize,
}

impl FilterProjection {
    /// Project a filter state onto UI controls.
    pub fn from_state(state: &FilterState) -> Self {
        let indicators = FilterKey::ALL
            .into_iter()
            .filter(|key| *key != FilterKey::Sort)
            .map(|key| FilterIndicator {
                key,
                value: state.get(key).map(str::to_string),
                active: state.is_active(key),
            })
            .collect();

        Self {
            indicators,
            sort: state.sort_key(),
            badge_count: state.active_count(),
        }
    }

    /// Whether the filter-count badge should be visible.
    pub fn show_badge(&self) -> bool {
        self.badge_count > 0
    }

    /// Indicator for a key. `None` for the sort key.
    pub fn indicator(&self, key: FilterKey) -> Option<&FilterIndicator> {
        self.indicators.iter().find(|i| i.key == key)
    }
}
