//! Synchronous publish/subscribe fan-out for canvas events.
//!
//! Events are queued first and delivered by whichever thread holds the
//! delivery token, so callbacks never run under a canvas lock and observe
//! events in the order the mutations happened.

use std::collections::VecDeque;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, warn};

use super::types::CanvasEvent;

/// Subscriber callback.
pub type Callback = Arc<dyn Fn(&CanvasEvent) + Send + Sync>;

/// Handle returned by [`EventDispatcher::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Raw numeric value.
    #[must_use]
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Fan-out of [`CanvasEvent`]s to registered callbacks.
pub struct EventDispatcher {
    subscribers: RwLock<Vec<(SubscriptionId, Callback)>>,
    next_id: AtomicU64,
    pending: Mutex<VecDeque<CanvasEvent>>,
    delivering: Mutex<()>,
}

impl EventDispatcher {
    /// Creates a dispatcher with no subscribers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            next_id: AtomicU64::new(1),
            pending: Mutex::new(VecDeque::new()),
            delivering: Mutex::new(()),
        }
    }

    /// Registers `callback`; it sees every event delivered from now on.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CanvasEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.subscribers.write().push((id, Arc::new(callback)));
        debug!(subscription = %id, "Subscriber added");
        id
    }

    /// Removes a subscriber. Returns `false` if `id` was unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut subscribers = self.subscribers.write();
        let before = subscribers.len();
        subscribers.retain(|(sid, _)| *sid != id);
        let removed = subscribers.len() != before;
        if removed {
            debug!(subscription = %id, "Subscriber removed");
        }
        removed
    }

    /// Number of registered subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    /// Queues and delivers `event`.
    pub fn publish(&self, event: CanvasEvent) {
        self.enqueue(event);
        self.flush();
    }

    /// Queues `event` without delivering it.
    ///
    /// Canvases call this while holding their write lock so that queue order
    /// equals mutation order, then call [`flush`](Self::flush) after release.
    pub fn enqueue(&self, event: CanvasEvent) {
        self.pending.lock().push_back(event);
    }

    /// Delivers queued events unless another thread (or an outer frame of
    /// this one) is already delivering; that deliverer drains them instead.
    pub fn flush(&self) {
        loop {
            let Some(token) = self.delivering.try_lock() else {
                return;
            };
            while let Some(event) = self.next_pending() {
                self.deliver(&event);
            }
            drop(token);

            // An enqueue may have slipped in between the last pop and release.
            if self.pending.lock().is_empty() {
                return;
            }
        }
    }

    fn next_pending(&self) -> Option<CanvasEvent> {
        self.pending.lock().pop_front()
    }

    fn deliver(&self, event: &CanvasEvent) {
        let subscribers: Vec<(SubscriptionId, Callback)> = self.subscribers.read().clone();
        for (id, callback) in subscribers {
            let outcome = catch_unwind(AssertUnwindSafe(|| callback(event)));
            if outcome.is_err() {
                warn!(
                    subscription = %id,
                    event_type = %event.kind(),
                    canvas_id = %event.canvas_id(),
                    "Subscriber panicked"
                );
            }
        }
    }
}

impl Default for EventDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("subscribers", &self.subscriber_count())
            .field("pending", &self.pending.lock().len())
            .finish_non_exhaustive()
    }
}
