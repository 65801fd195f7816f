//! Bridge from the synchronous dispatcher to async consumers.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::dispatcher::{EventDispatcher, SubscriptionId};
use super::types::CanvasEvent;
use crate::infrastructure::config::CanvasSettings;

/// Errors surfaced to async event consumers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    /// Every sender is gone.
    #[error("Event channel closed")]
    Closed,
    /// The receiver fell behind and skipped events.
    #[error("Receiver lagged behind by {0} events")]
    Lagged(u64),
}

/// Re-publishes canvas events on a `tokio::sync::broadcast` channel.
#[derive(Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<CanvasEvent>,
    client_count: Arc<AtomicUsize>,
}

impl EventBroadcaster {
    /// Creates a broadcaster with the default channel capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(CanvasSettings::default().event_channel_capacity)
    }

    /// Creates a broadcaster buffering up to `capacity` events per receiver.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            client_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Forwards every event of `dispatcher` into this channel.
    ///
    /// # Returns
    ///
    /// The dispatcher subscription, for later `unsubscribe`.
    pub fn attach(&self, dispatcher: &EventDispatcher) -> SubscriptionId {
        let this = self.clone();
        dispatcher.subscribe(move |event| this.broadcast(event.clone()))
    }

    /// Subscribes a new async consumer.
    pub fn subscribe(&self) -> EventReceiver {
        self.client_count.fetch_add(1, Ordering::SeqCst);
        debug!(client_count = self.client_count(), "Client subscribed");
        EventReceiver {
            inner: self.sender.subscribe(),
            client_count: Arc::clone(&self.client_count),
        }
    }

    /// Sends `event` to every receiver. Having none is not an error.
    pub fn broadcast(&self, event: CanvasEvent) {
        match self.sender.send(event) {
            Ok(receiver_count) => debug!(receiver_count, "Broadcast sent"),
            Err(_) => debug!("Broadcast dropped, no clients connected"),
        }
    }

    /// Returns the number of live receivers.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.client_count.load(Ordering::SeqCst)
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBroadcaster")
            .field("client_count", &self.client_count())
            .finish_non_exhaustive()
    }
}

/// Receiving end of an [`EventBroadcaster`].
pub struct EventReceiver {
    inner: broadcast::Receiver<CanvasEvent>,
    client_count: Arc<AtomicUsize>,
}

impl EventReceiver {
    /// Waits for the next event.
    ///
    /// # Errors
    ///
    /// Returns `BroadcastError::Closed` once all senders are dropped and
    /// `BroadcastError::Lagged` if events were skipped; the receiver stays
    /// usable after a lag.
    pub async fn recv(&mut self) -> Result<CanvasEvent, BroadcastError> {
        self.inner.recv().await.map_err(|e| match e {
            broadcast::error::RecvError::Closed => BroadcastError::Closed,
            broadcast::error::RecvError::Lagged(count) => {
                warn!(skipped = count, "Receiver lagged");
                BroadcastError::Lagged(count)
            }
        })
    }

    /// Returns the next event if one is ready.
    ///
    /// # Errors
    ///
    /// As [`recv`](Self::recv); `Ok(None)` when nothing is buffered.
    pub fn try_recv(&mut self) -> Result<Option<CanvasEvent>, BroadcastError> {
        match self.inner.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(broadcast::error::TryRecvError::Empty) => Ok(None),
            Err(broadcast::error::TryRecvError::Closed) => Err(BroadcastError::Closed),
            Err(broadcast::error::TryRecvError::Lagged(count)) => {
                warn!(skipped = count, "Receiver lagged");
                Err(BroadcastError::Lagged(count))
            }
        }
    }
}

impl Drop for EventReceiver {
    fn drop(&mut self) {
        self.client_count.fetch_sub(1, Ordering::SeqCst);
        debug!(
            client_count = self.client_count.load(Ordering::SeqCst),
            "Client unsubscribed"
        );
    }
}
