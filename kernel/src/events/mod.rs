//! Canvas events: payload types, the synchronous dispatcher and the async
//! broadcaster.

pub mod broadcaster;
pub mod dispatcher;
pub mod types;

pub use broadcaster::{BroadcastError, EventBroadcaster, EventReceiver};
pub use dispatcher::{Callback, EventDispatcher, SubscriptionId};
pub use types::{CanvasEvent, EventKind};
