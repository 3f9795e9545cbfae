//! Catalog data sources.
//!
//! Provides the transport-agnostic [`CatalogSource`] trait and two
//! implementations: an in-process source over JSON records and a JSON-RPC
//! client for a remote search endpoint.

mod memory;
mod rpc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub use memory::MemoryCatalogSource;
pub use rpc::{RpcCatalogSource, encode_domain};

use crate::error::CatalogResult;
use crate::filter::FilterKey;
use crate::query::Query;

/// Catalog data source trait.
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the records matching a query.
    async fn fetch(&self, query: &Query) -> CatalogResult<Vec<CatalogRecord>>;

    /// Suggest titles and authors for a search prefix, titles first.
    ///
    /// Sources without autocomplete support return nothing.
    async fn suggest(&self, _prefix: &str, _limit: usize) -> CatalogResult<Vec<Suggestion>> {
        Ok(Vec::new())
    }

    /// Short name used in log fields (e.g., "memory", "rpc").
    fn name(&self) -> &'static str;
}

/// What an autocomplete entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Title,
    Author,
}

/// One autocomplete entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suggestion {
    pub kind: SuggestionKind,

    /// Id of the record or author.
    pub id: i64,

    /// Text shown and applied.
    pub value: String,
}

impl Suggestion {
    pub fn title(id: i64, value: impl Into<String>) -> Self {
        Self {
            kind: SuggestionKind::Title,
            id,
            value: value.into(),
        }
    }

    pub fn author(id: i64, value: impl Into<String>) -> Self {
        Self {
            kind: SuggestionKind::Author,
            id,
            value: value.into(),
        }
    }

    /// Filter change that applies this suggestion.
    ///
    /// Titles become the search term; authors select the author filter.
    pub fn filter(&self) -> (FilterKey, String) {
        match self.kind {
            SuggestionKind::Title => (FilterKey::Search, self.value.clone()),
            SuggestionKind::Author => (FilterKey::Author, self.id.to_string()),
        }
    }
}

/// Title slots out of a suggestion limit. Authors get the remainder.
///
/// Eight suggestions split five titles to three authors.
pub(crate) fn title_slots(limit: usize) -> usize {
    limit - limit * 3 / 8
}

/// A single catalog record.
///
/// Opaque beyond its id; every other field is carried through for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogRecord {
    pub id: i64,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl CatalogRecord {
    /// Create a record with no display fields.
    pub fn new(id: i64) -> Self {
        Self {
            id,
            fields: Map::new(),
        }
    }

    /// Set a display field.
    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    /// Build a record from a JSON object. Requires an integer `id`.
    pub fn from_json(value: Value) -> Option<Self> {
        let Value::Object(mut fields) = value else {
            return None;
        };
        let id = fields.remove("id")?.as_i64()?;
        Some(Self { id, fields })
    }

    /// Look up a display field.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }

    /// The record's display name, when it has one.
    pub fn display_name(&self) -> Option<&str> {
        self.field("name").and_then(Value::as_str)
    }
}
