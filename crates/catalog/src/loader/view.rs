//! Catalog view: filter state, debounced search, and loader in one unit.
//!
//! A view owns its own [`FilterState`] and result set. Text search goes
//! through a [`Debouncer`]; discrete filters reload immediately. Dropping the
//! view (or calling [`CatalogView::teardown`]) cancels the pending search and
//! turns any outstanding fetch into a no-op.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::watch;

use super::catalog_loader::{CatalogLoader, ReloadOutcome, ResultSet};
use super::debounce::Debouncer;
use crate::config::CatalogConfig;
use crate::filter::{FilterKey, FilterState};
use crate::query::CatalogQueryBuilder;
use crate::source::{CatalogSource, Suggestion};
use crate::sync::FilterProjection;

/// Prefixes shorter than this never reach the source.
pub const SUGGEST_MIN_CHARS: usize = 2;

/// Maximum number of autocomplete suggestions.
pub const SUGGEST_LIMIT: usize = 8;

/// A mounted catalog view.
pub struct CatalogView {
    filters: Mutex<FilterState>,
    loader: CatalogLoader,
    search_input: Debouncer<String>,
    projection: watch::Sender<FilterProjection>,
}

impl CatalogView {
    /// Mount a view, seeding filters from URL parameters when given.
    ///
    /// Nothing is fetched until the first reload.
    pub fn mount(
        source: Arc<dyn CatalogSource>,
        config: &CatalogConfig,
        params: Option<&str>,
    ) -> Arc<Self> {
        let filters = params
            .map(FilterState::from_query_string)
            .unwrap_or_default();
        let (projection, _) = watch::channel(FilterProjection::from_state(&filters));
        let loader = CatalogLoader::new(
            source,
            CatalogQueryBuilder::new(config.result_limit),
            config.fetch_timeout,
        );

        tracing::debug!(
            active_filters = filters.active_count(),
            "catalog view mounted"
        );

        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            let search_input = Debouncer::new(config.search_debounce, move |value: String| {
                let weak = weak.clone();
                async move {
                    if let Some(view) = weak.upgrade() {
                        view.apply_search(value).await;
                    }
                }
            });

            Self {
                filters: Mutex::new(filters),
                loader,
                search_input,
                projection,
            }
        })
    }

    /// Feed raw search-box input. Applied after the debounce delay.
    pub fn on_search_input(&self, raw: impl Into<String>) {
        self.search_input.on_input(raw.into());
    }

    async fn apply_search(&self, value: String) -> ReloadOutcome {
        self.mutate(|filters| filters.set(FilterKey::Search, value));
        self.reload().await
    }

    /// Set a discrete filter and reload immediately.
    pub async fn set_filter(&self, key: FilterKey, value: impl Into<String>) -> ReloadOutcome {
        let value = value.into();
        self.mutate(|filters| filters.set(key, value));
        self.reload().await
    }

    /// Reset every filter to its default and reload.
    pub async fn clear_filters(&self) -> ReloadOutcome {
        self.search_input.cancel();
        self.mutate(FilterState::reset);
        self.reload().await
    }

    /// Reload with the current filters.
    pub async fn reload(&self) -> ReloadOutcome {
        // Issue under the filters lock so sequence order matches filter order.
        let pending = {
            let filters = self.filters.lock();
            self.loader.reload(&filters)
        };
        pending.await
    }

    fn mutate<F>(&self, change: F)
    where
        F: FnOnce(&mut FilterState),
    {
        let projection = {
            let mut filters = self.filters.lock();
            change(&mut filters);
            FilterProjection::from_state(&filters)
        };
        self.projection.send_replace(projection);
    }

    /// Copy of the current filter state.
    pub fn filters(&self) -> FilterState {
        self.filters.lock().clone()
    }

    /// Current UI projection of the filters.
    pub fn projection(&self) -> FilterProjection {
        self.projection.borrow().clone()
    }

    /// Receive a fresh projection after every filter change.
    pub fn subscribe(&self) -> watch::Receiver<FilterProjection> {
        self.projection.subscribe()
    }

    /// Copy of the current result set.
    pub fn results(&self) -> ResultSet {
        self.loader.snapshot()
    }

    /// URL query string reflecting the current filters.
    pub fn query_string(&self) -> String {
        self.filters.lock().to_query_string()
    }

    /// Whether a debounced search is waiting to fire.
    pub fn search_pending(&self) -> bool {
        self.search_input.is_pending()
    }

    /// Autocomplete suggestions for a search prefix, titles before authors.
    ///
    /// Short prefixes and failures yield an empty list.
    pub async fn suggest(&self, prefix: &str) -> Vec<Suggestion> {
        let prefix = prefix.trim();
        if prefix.chars().count() < SUGGEST_MIN_CHARS || self.is_torn_down() {
            return Vec::new();
        }

        let source = self.loader.source();
        let timeout = self.loader.fetch_timeout();
        match tokio::time::timeout(timeout, source.suggest(prefix, SUGGEST_LIMIT)).await {
            Ok(Ok(mut suggestions)) => {
                suggestions.truncate(SUGGEST_LIMIT);
                suggestions
            }
            Ok(Err(e)) => {
                tracing::warn!(error = %e, source = source.name(), "catalog suggest failed");
                Vec::new()
            }
            Err(_) => {
                tracing::warn!(?timeout, source = source.name(), "catalog suggest timed out");
                Vec::new()
            }
        }
    }

    /// Apply a chosen suggestion and reload.
    ///
    /// A pending debounced search is dropped so it cannot overwrite the choice.
    pub async fn apply_suggestion(&self, suggestion: &Suggestion) -> ReloadOutcome {
        self.search_input.cancel();
        let (key, value) = suggestion.filter();
        self.set_filter(key, value).await
    }

    /// Release the view: cancel pending input and ignore outstanding fetches.
    pub fn teardown(&self) {
        if self.is_torn_down() {
            return;
        }
        self.search_input.close();
        self.loader.detach();
        tracing::debug!("catalog view torn down");
    }

    pub fn is_torn_down(&self) -> bool {
        self.loader.is_detached()
    }
}

impl Drop for CatalogView {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::source::{CatalogRecord, MemoryCatalogSource};
    use std::time::Duration;

    fn view(params: Option<&str>) -> Arc<CatalogView> {
        let source = MemoryCatalogSource::new(vec![
            CatalogRecord::new(1)
                .with_field("name", "The Hobbit")
                .with_field("category_id", 1),
            CatalogRecord::new(2)
                .with_field("name", "Dune")
                .with_field("category_id", 2),
        ]);
        CatalogView::mount(Arc::new(source), &CatalogConfig::default(), params)
    }

    #[tokio::test]
    async fn mount_seeds_filters_and_stays_idle() {
        let view = view(Some("category=2&order=name_desc"));
        assert_eq!(view.filters().get(FilterKey::Category), Some("2"));
        assert_eq!(view.projection().badge_count, 1);
        assert!(view.results().loaded_at.is_none());
        assert!(!view.results().loading);
    }

    #[tokio::test]
    async fn set_filter_reloads_immediately() {
        let view = view(None);
        let outcome = view.set_filter(FilterKey::Category, "1").await;
        assert_eq!(outcome, ReloadOutcome::Applied { records: 1 });
        assert_eq!(view.results().records[0].id, 1);
        assert_eq!(view.query_string(), "category=1&order=name");
    }

    #[tokio::test]
    async fn clear_filters_restores_defaults() {
        let view = view(Some("category=1&search=hob"));
        view.clear_filters().await;
        assert_eq!(view.filters(), FilterState::default());
        assert_eq!(view.results().len(), 2);
    }

    #[tokio::test]
    async fn subscribers_see_filter_changes() {
        let view = view(None);
        let mut rx = view.subscribe();
        view.set_filter(FilterKey::Availability, "available").await;

        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().badge_count, 1);
    }

    #[tokio::test]
    async fn short_prefix_is_not_suggested() {
        let view = view(None);
        assert!(view.suggest(" d ").await.is_empty());
        assert_eq!(view.suggest("du").await, vec![Suggestion::title(2, "Dune")]);
    }

    #[tokio::test(start_paused = true)]
    async fn teardown_drops_pending_search() {
        let view = view(None);
        view.on_search_input("dune");
        assert!(view.search_pending());

        view.teardown();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert!(view.filters().get(FilterKey::Search).is_none());
        assert!(view.results().loaded_at.is_none());
        assert_eq!(view.reload().await, ReloadOutcome::Detached);
    }
}
