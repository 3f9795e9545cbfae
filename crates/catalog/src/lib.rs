//! Lectern catalog library
//!
//! Headless catalog view component: filter state, deterministic query
//! building, debounced search input, and a loader that keeps the result set
//! in step with the most recently issued request.
//! The `lectern` binary drives a single view against a JSON-RPC endpoint.

pub mod config;
pub mod error;
pub mod filter;
pub mod loader;
pub mod prefs;
pub mod query;
pub mod source;
pub mod sync;

pub use config::CatalogConfig;
pub use error::{CatalogError, CatalogResult};
pub use filter::{FilterKey, FilterState, SortKey};
pub use loader::{CatalogLoader, CatalogView, Debouncer, ReloadOutcome, ResultSet, ResultStatus};
pub use query::{CatalogQueryBuilder, Query};
pub use source::{
    CatalogRecord, CatalogSource, MemoryCatalogSource, RpcCatalogSource, Suggestion, SuggestionKind,
};
pub use sync::FilterProjection;
