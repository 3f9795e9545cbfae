//! Catalog loader: filter state in, result set out.
//!
//! Each [`CatalogLoader::reload`] call takes a sequence number. A fetch that
//! settles after a newer reload was issued is discarded, so the result set
//! always reflects the most recently *issued* request, whatever order the
//! fetches complete in.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::CatalogError;
use crate::filter::FilterState;
use crate::query::{CatalogQueryBuilder, Query};
use crate::source::{CatalogRecord, CatalogSource};

/// Records from the most recently accepted fetch plus load flags.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResultSet {
    pub records: Vec<CatalogRecord>,

    /// A reload is outstanding. Previous records stay visible meanwhile.
    pub loading: bool,

    /// Message from the last failed fetch, cleared by the next success.
    pub error: Option<String>,

    /// When records were last replaced.
    pub loaded_at: Option<DateTime<Utc>>,
}

/// What a view should show for a result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// Nothing has been requested yet.
    NotLoaded,
    Loading,
    /// The last fetch failed.
    Failed,
    /// The last fetch succeeded with zero records.
    NoResults,
    Loaded,
}

impl ResultSet {
    pub fn status(&self) -> ResultStatus {
        if self.loading {
            ResultStatus::Loading
        } else if self.error.is_some() {
            ResultStatus::Failed
        } else if self.loaded_at.is_none() {
            ResultStatus::NotLoaded
        } else if self.records.is_empty() {
            ResultStatus::NoResults
        } else {
            ResultStatus::Loaded
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// How a reload settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Records were replaced.
    Applied { records: usize },
    /// The fetch failed; previous records were kept.
    Failed,
    /// A newer reload was issued before this one settled.
    Superseded,
    /// The loader was detached; nothing was changed.
    Detached,
}

/// A reload that has been issued but not yet settled.
struct Ticket {
    sequence: u64,
    query: Query,
}

/// Loads catalog records for a filter state.
pub struct CatalogLoader {
    source: Arc<dyn CatalogSource>,
    builder: CatalogQueryBuilder,
    fetch_timeout: Duration,
    results: Mutex<ResultSet>,
    issued: AtomicU64,
    alive: CancellationToken,
}

impl CatalogLoader {
    /// Create a loader. `fetch_timeout` bounds every fetch.
    pub fn new(
        source: Arc<dyn CatalogSource>,
        builder: CatalogQueryBuilder,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            source,
            builder,
            fetch_timeout,
            results: Mutex::new(ResultSet::default()),
            issued: AtomicU64::new(0),
            alive: CancellationToken::new(),
        }
    }

    /// Reload records for `state`.
    ///
    /// The sequence number, the query and `loading = true` are all set
    /// before this returns, so callers can show a spinner without polling.
    /// Failures are recorded on the result set, never returned.
    pub fn reload<'a>(
        &'a self,
        state: &FilterState,
    ) -> impl Future<Output = ReloadOutcome> + Send + use<'a> {
        let ticket = self.issue(state);
        async move {
            match ticket {
                Some(ticket) => self.settle(ticket).await,
                None => ReloadOutcome::Detached,
            }
        }
    }

    fn issue(&self, state: &FilterState) -> Option<Ticket> {
        let query = self.builder.build(state);
        let mut results = self.results.lock();
        if self.alive.is_cancelled() {
            tracing::debug!("catalog loader detached; ignoring reload");
            return None;
        }
        let sequence = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        results.loading = true;
        drop(results);

        tracing::debug!(
            sequence,
            clauses = query.clauses.len(),
            source = self.source.name(),
            "catalog reload issued"
        );
        Some(Ticket { sequence, query })
    }

    async fn settle(&self, ticket: Ticket) -> ReloadOutcome {
        let fetched =
            match tokio::time::timeout(self.fetch_timeout, self.source.fetch(&ticket.query)).await
            {
                Ok(result) => result,
                Err(_) => Err(CatalogError::Timeout(self.fetch_timeout)),
            };

        let mut results = self.results.lock();
        if self.alive.is_cancelled() {
            tracing::debug!(sequence = ticket.sequence, "catalog fetch settled after detach; discarding");
            return ReloadOutcome::Detached;
        }

        let latest = self.issued.load(Ordering::SeqCst);
        if ticket.sequence != latest {
            tracing::debug!(
                sequence = ticket.sequence,
                latest,
                "stale catalog response; discarding"
            );
            return ReloadOutcome::Superseded;
        }

        results.loading = false;
        match fetched {
            Ok(records) => {
                let count = records.len();
                results.records = records;
                results.error = None;
                results.loaded_at = Some(Utc::now());
                tracing::debug!(sequence = ticket.sequence, records = count, "catalog reload applied");
                ReloadOutcome::Applied { records: count }
            }
            Err(e) => {
                tracing::warn!(
                    sequence = ticket.sequence,
                    source = self.source.name(),
                    transient = e.is_transient(),
                    error = %e,
                    "catalog fetch failed; keeping previous results"
                );
                results.error = Some(e.to_string());
                ReloadOutcome::Failed
            }
        }
    }

    /// Copy of the current result set.
    pub fn snapshot(&self) -> ResultSet {
        self.results.lock().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.results.lock().loading
    }

    /// Sequence number of the most recently issued reload (0 before any).
    pub fn latest_sequence(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Stop applying results. Outstanding fetches settle as no-ops.
    ///
    /// The loading flag is cleared; records and error stay as they were.
    pub fn detach(&self) {
        let mut results = self.results.lock();
        self.alive.cancel();
        results.loading = false;
    }

    pub fn is_detached(&self) -> bool {
        self.alive.is_cancelled()
    }

    pub fn source(&self) -> &Arc<dyn CatalogSource> {
        &self.source
    }

    pub fn fetch_timeout(&self) -> Duration {
        self.fetch_timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::FilterKey;
    use crate::source::MemoryCatalogSource;

    fn loader() -> CatalogLoader {
        let source = MemoryCatalogSource::new(vec![
            CatalogRecord::new(1).with_field("name", "Dune"),
            CatalogRecord::new(2).with_field("name", "Emma"),
        ]);
        CatalogLoader::new(
            Arc::new(source),
            CatalogQueryBuilder::default(),
            Duration::from_secs(1),
        )
    }

    #[test]
    fn starts_idle_and_empty() {
        let loader = loader();
        let results = loader.snapshot();
        assert!(results.records.is_empty());
        assert!(!results.loading);
        assert_eq!(results.status(), ResultStatus::NotLoaded);
        assert_eq!(loader.latest_sequence(), 0);
    }

    #[tokio::test]
    async fn loading_is_set_before_first_poll() {
        let loader = loader();
        let pending = loader.reload(&FilterState::default());
        assert!(loader.is_loading());
        assert_eq!(loader.latest_sequence(), 1);

        assert_eq!(pending.await, ReloadOutcome::Applied { records: 2 });
        assert!(!loader.is_loading());
        assert_eq!(loader.snapshot().status(), ResultStatus::Loaded);
    }

    #[tokio::test]
    async fn empty_result_is_not_an_error() {
        let loader = loader();
        let state = FilterState::new().with(FilterKey::Search, "zzz");
        assert_eq!(loader.reload(&state).await, ReloadOutcome::Applied { records: 0 });

        let results = loader.snapshot();
        assert!(results.error.is_none());
        assert_eq!(results.status(), ResultStatus::NoResults);
    }

    #[tokio::test]
    async fn detached_loader_ignores_reload() {
        let loader = loader();
        loader.detach();
        assert_eq!(loader.reload(&FilterState::default()).await, ReloadOutcome::Detached);
        assert!(!loader.is_loading());
        assert_eq!(loader.latest_sequence(), 0);
    }

    #[tokio::test]
    async fn detach_clears_loading() {
        let loader = loader();
        let pending = loader.reload(&FilterState::default());
        assert!(loader.is_loading());

        loader.detach();
        assert!(!loader.is_loading());
        assert_eq!(pending.await, ReloadOutcome::Detached);
        assert_eq!(loader.snapshot().status(), ResultStatus::NotLoaded);
    }

    #[test]
    fn status_precedence() {
        let mut results = ResultSet {
            loaded_at: Some(Utc::now()),
            ..Default::default()
        };
        assert_eq!(results.status(), ResultStatus::NoResults);

        results.error = Some("down".to_string());
        assert_eq!(results.status(), ResultStatus::Failed);

        results.loading = true;
        assert_eq!(results.status(), ResultStatus::Loading);
    }
}
