//! Catalog loading module.
//!
//! This module provides:
//! - CatalogLoader: reload state machine with stale-response suppression
//! - Debouncer: coalesces rapid input into one delayed trigger
//! - CatalogView: filters, debounced search and loader composed per view

mod catalog_loader;
mod debounce;
mod view;

pub use catalog_loader::{CatalogLoader, ReloadOutcome, ResultSet, ResultStatus};
pub use debounce::Debouncer;
pub use view::{CatalogView, SUGGEST_LIMIT, SUGGEST_MIN_CHARS};
