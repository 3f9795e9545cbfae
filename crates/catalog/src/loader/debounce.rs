//! Debounced input controller.
//!
//! Coalesces rapid input events into a single delayed invocation. Every
//! [`Debouncer::on_input`] call replaces the pending one, so only the last
//! value inside a window reaches the handler.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

type HandlerFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type Handler<T> = Arc<dyn Fn(T) -> HandlerFuture + Send + Sync>;

/// Delays a handler until input has been quiet for `delay`.
///
/// Must be used from within a tokio runtime.
pub struct Debouncer<T> {
    delay: Duration,
    handler: Handler<T>,
    pending: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl<T: Send + 'static> Debouncer<T> {
    /// Create a debouncer invoking `handler` after `delay` of quiet.
    ///
    /// A zero delay dispatches every input immediately.
    pub fn new<F, Fut>(delay: Duration, handler: F) -> Self
    where
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            delay,
            handler: Arc::new(move |value| Box::pin(handler(value)) as HandlerFuture),
            pending: Mutex::new(None),
            closed: AtomicBool::new(false),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record an input event, replacing any pending invocation.
    pub fn on_input(&self, value: T) {
        if self.is_closed() {
            tracing::debug!("debouncer closed; ignoring input");
            return;
        }

        let mut pending = self.pending.lock();
        if let Some(previous) = pending.take() {
            previous.abort();
        }

        let handler = Arc::clone(&self.handler);
        if self.delay.is_zero() {
            tokio::spawn(handler(value));
            return;
        }

        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // Detached so a later abort cannot cut the handler short.
            tokio::spawn(handler(value));
        }));
    }

    /// Whether an invocation is scheduled but has not fired yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Drop the pending invocation, if any.
    pub fn cancel(&self) {
        if let Some(handle) = self.pending.lock().take() {
            handle.abort();
        }
    }

    /// Cancel and refuse further input.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.get_mut().take() {
            handle.abort();
        }
    }
}
