#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! [`ScriptedSource`] hands every fetch to the test through a [`FetchQueue`]
//! and blocks until the test replies. Completion order is therefore chosen by
//! the test, independently of the order reloads were issued in.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, oneshot};

use lectern_catalog::query::Query;
use lectern_catalog::{CatalogError, CatalogRecord, CatalogResult, CatalogSource};

/// A fetch waiting for the test to settle it.
pub struct PendingFetch {
    pub query: Query,
    reply: oneshot::Sender<CatalogResult<Vec<CatalogRecord>>>,
}

impl PendingFetch {
    pub fn succeed(self, records: Vec<CatalogRecord>) {
        let _ = self.reply.send(Ok(records));
    }

    pub fn fail(self, error: CatalogError) {
        let _ = self.reply.send(Err(error));
    }
}

/// Catalog source whose fetches are settled by the test.
pub struct ScriptedSource {
    fetches: mpsc::UnboundedSender<PendingFetch>,
}

/// Receiving end of a [`ScriptedSource`].
pub struct FetchQueue {
    fetches: mpsc::UnboundedReceiver<PendingFetch>,
}

impl FetchQueue {
    /// Wait for the next fetch to reach the source.
    pub async fn next(&mut self) -> PendingFetch {
        self.fetches
            .recv()
            .await
            .expect("scripted source dropped")
    }

    /// The next fetch, if one has already arrived.
    pub fn try_next(&mut self) -> Option<PendingFetch> {
        self.fetches.try_recv().ok()
    }
}

/// Create a scripted source and its queue.
pub fn scripted() -> (Arc<ScriptedSource>, FetchQueue) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        Arc::new(ScriptedSource { fetches: tx }),
        FetchQueue { fetches: rx },
    )
}

#[async_trait]
impl CatalogSource for ScriptedSource {
    async fn fetch(&self, query: &Query) -> CatalogResult<Vec<CatalogRecord>> {
        let (reply, settled) = oneshot::channel();
        self.fetches
            .send(PendingFetch {
                query: query.clone(),
                reply,
            })
            .map_err(|_| CatalogError::Unavailable("fetch queue closed".to_string()))?;

        settled
            .await
            .unwrap_or_else(|_| Err(CatalogError::Unavailable("fetch abandoned".to_string())))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

/// A book record shaped like the remote catalog's rows.
pub fn book(id: i64, name: &str, author_id: i64, author: &str, category: i64) -> CatalogRecord {
    CatalogRecord::new(id)
        .with_field("name", name)
        .with_field("author_ids", json!([{ "id": author_id, "name": author }]))
        .with_field("author_names", author)
        .with_field("keywords", "")
        .with_field("category_id", category)
        .with_field("availability", "available")
        .with_field("registration_date", format!("2024-01-{id:02}"))
}

/// A small shelf of books.
pub fn books() -> Vec<CatalogRecord> {
    vec![
        book(1, "The Hobbit", 10, "J.R.R. Tolkien", 1),
        book(2, "Dune", 20, "Frank Herbert", 2),
        book(3, "The Silmarillion", 10, "J.R.R. Tolkien", 1),
        book(4, "Emma", 30, "Jane Austen", 3),
    ]
}

/// Record ids in result order.
pub fn ids(records: &[CatalogRecord]) -> Vec<i64> {
    records.iter().map(|r| r.id).collect()
}
