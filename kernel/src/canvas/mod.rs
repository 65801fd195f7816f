//! Canvas aggregate.
//!
//! A [`Canvas`] owns one message graph plus its branches behind a single
//! coarse lock. Handles are cheap clones sharing the same state; every
//! mutation runs entirely under the write lock and announces itself through
//! the canvas's [`EventDispatcher`].

mod branch;
mod data;

pub use branch::Branch;
pub use data::{CanvasData, CanvasSummary};

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::branch_manager::{BranchInfo, BranchManager, CheckoutOptions};
use crate::error::CanvasError;
use crate::events::{CanvasEvent, EventDispatcher, SubscriptionId};
use crate::graph::{Message, MessageNode, Meta, NodeId};
use crate::infrastructure::config::CanvasSettings;

/// Canvas identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanvasId(String);

impl CanvasId {
    /// Creates a canvas ID from a string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh random ID.
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    /// Get the string representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanvasId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for CanvasId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CanvasId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

struct CanvasInner {
    id: CanvasId,
    created_at: DateTime<Utc>,
    dispatcher: Arc<EventDispatcher>,
    state: RwLock<CanvasState>,
}

struct CanvasState {
    manager: BranchManager,
    title: Option<String>,
    description: Option<String>,
    last_updated: DateTime<Utc>,
}

/// A version-controlled conversation graph.
#[derive(Clone)]
pub struct Canvas {
    inner: Arc<CanvasInner>,
}

impl Canvas {
    /// Creates a canvas with default settings and a private dispatcher.
    ///
    /// A random ID is generated when `id` is `None`. The default branch is
    /// created empty and active.
    #[must_use]
    pub fn new(id: Option<CanvasId>, title: Option<String>, description: Option<String>) -> Self {
        let mut builder = Self::builder();
        builder.id = id;
        builder.title = title;
        builder.description = description;
        builder.build()
    }

    /// Starts a [`CanvasBuilder`].
    #[must_use]
    pub fn builder() -> CanvasBuilder {
        CanvasBuilder::default()
    }

    /// Canvas identifier.
    #[must_use]
    pub fn id(&self) -> &CanvasId {
        &self.inner.id
    }

    /// Creation timestamp.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.inner.created_at
    }

    /// Current title.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.inner.state.read().title.clone()
    }

    /// Current description.
    #[must_use]
    pub fn description(&self) -> Option<String> {
        self.inner.state.read().description.clone()
    }

    /// Time of the last mutation.
    #[must_use]
    pub fn last_updated(&self) -> DateTime<Utc> {
        self.inner.state.read().last_updated
    }

    /// Replaces the title and/or description; `None` keeps the current value.
    pub fn update_details(&self, title: Option<String>, description: Option<String>) {
        let mut state = self.inner.state.write();
        if title.is_some() {
            state.title = title;
        }
        if description.is_some() {
            state.description = description;
        }
        state.last_updated = Utc::now();
        debug!(canvas_id = %self.inner.id, "Canvas details updated");
    }

    /// Dispatcher receiving this canvas's events.
    #[must_use]
    pub fn dispatcher(&self) -> &Arc<EventDispatcher> {
        &self.inner.dispatcher
    }

    /// Shorthand for `dispatcher().subscribe(..)`.
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&CanvasEvent) + Send + Sync + 'static,
    {
        self.inner.dispatcher.subscribe(callback)
    }

    /// Shorthand for `dispatcher().unsubscribe(..)`.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.dispatcher.unsubscribe(id)
    }

    /// Checks out a branch and returns a handle to it.
    ///
    /// See [`CheckoutOptions`] for the resolution rules. The resolved branch
    /// becomes the active one.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` when the branch is missing and may not be
    /// created, or `NotFound` when `start_from_node` does not resolve.
    pub fn checkout(&self, opts: CheckoutOptions) -> Result<Branch, CanvasError> {
        if opts.name.is_none() && opts.start_from_node.is_none() {
            return Ok(Branch::new(self.clone(), self.current_branch()));
        }
        let name = self.mutate(|state| Ok((state.manager.checkout(&opts)?, Vec::new())))?;
        debug!(canvas_id = %self.inner.id, branch = %name, "Checked out");
        Ok(Branch::new(self.clone(), name))
    }

    /// Handle to an existing branch without changing the active branch.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch does not exist.
    pub fn branch(&self, name: &str) -> Result<Branch, CanvasError> {
        self.inner.state.read().manager.branch(name)?;
        Ok(Branch::new(self.clone(), name.to_string()))
    }

    /// Name of the active branch.
    #[must_use]
    pub fn current_branch(&self) -> String {
        self.inner.state.read().manager.active_branch().to_string()
    }

    /// Appends `message` on top of `branch`.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch does not exist.
    pub fn commit_message(
        &self,
        branch: &str,
        message: Message,
        meta: Option<Meta>,
    ) -> Result<MessageNode, CanvasError> {
        let id = self.inner.id.clone();
        self.mutate(|state| {
            let node = state.manager.commit(branch, message, meta)?;
            let event = CanvasEvent::commit(id, node.clone());
            Ok((node, vec![event]))
        })
    }

    /// Replaces the message of node `id`, merging `meta` into its metadata.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the node does not exist.
    pub fn update_message(
        &self,
        id: &NodeId,
        message: Message,
        meta: Option<Meta>,
    ) -> Result<MessageNode, CanvasError> {
        let canvas_id = self.inner.id.clone();
        self.mutate(|state| {
            let node = state.manager.update_message(id, message, meta)?;
            let event = CanvasEvent::update(canvas_id, node.clone());
            Ok((node, vec![event]))
        })
    }

    /// Merges the HEADs of `sources` into `target` with a single node.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` for unknown branches, `InvalidArgument` for
    /// an empty `sources`, and `InvalidState` when a source has no commits.
    pub fn merge<S: AsRef<str>>(
        &self,
        sources: &[S],
        message: Message,
        target: &str,
    ) -> Result<MessageNode, CanvasError> {
        let sources: Vec<String> = sources.iter().map(|s| s.as_ref().to_string()).collect();
        let canvas_id = self.inner.id.clone();
        self.mutate(|state| {
            let outcome = state.manager.merge(&sources, message, target)?;
            let mut events = Vec::with_capacity(outcome.linked.len() + 1);
            events.push(CanvasEvent::commit(canvas_id.clone(), outcome.node.clone()));
            events.extend(
                outcome
                    .linked
                    .into_iter()
                    .map(|donor| CanvasEvent::update(canvas_id.clone(), donor)),
            );
            Ok((outcome.node, events))
        })
    }

    /// Removes a branch pointer; its nodes stay.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for the active branch and `BranchNotFound` for
    /// an unknown one.
    pub fn delete_branch(&self, name: &str) -> Result<BranchInfo, CanvasError> {
        self.mutate(|state| Ok((state.manager.delete_branch(name)?, Vec::new())))
    }

    /// Node at the HEAD of `branch`, or of the active branch.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if `branch` is given and unknown.
    pub fn get_head_node(&self, branch: Option<&str>) -> Result<Option<MessageNode>, CanvasError> {
        self.inner.state.read().manager.head_node(branch)
    }

    /// All branches in creation order.
    #[must_use]
    pub fn list_branches(&self) -> Vec<BranchInfo> {
        self.inner.state.read().manager.list_branches()
    }

    /// Snapshot of one node.
    #[must_use]
    pub fn get_node(&self, id: &NodeId) -> Option<MessageNode> {
        self.inner.state.read().manager.graph().get_node(id).cloned()
    }

    /// Root-first path ending at `id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the node does not exist.
    pub fn ancestry(&self, id: &NodeId) -> Result<Vec<MessageNode>, CanvasError> {
        self.inner.state.read().manager.graph().ancestry(id)
    }

    /// Snapshot of every node in insertion order.
    #[must_use]
    pub fn nodes(&self) -> Vec<MessageNode> {
        self.inner.state.read().manager.graph().nodes().cloned().collect()
    }

    /// Root node IDs in insertion order.
    #[must_use]
    pub fn root_ids(&self) -> Vec<NodeId> {
        self.inner.state.read().manager.graph().root_ids().to_vec()
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.inner.state.read().manager.graph().len()
    }

    /// Lightweight description for listings.
    #[must_use]
    pub fn summary(&self) -> CanvasSummary {
        let state = self.inner.state.read();
        CanvasSummary {
            canvas_id: self.inner.id.clone(),
            created_at: self.inner.created_at,
            title: state.title.clone(),
            description: state.description.clone(),
            root_ids: state.manager.graph().root_ids().to_vec(),
            node_count: state.manager.graph().len(),
            branch_count: state.manager.branch_count(),
            last_updated: state.last_updated,
        }
    }

    /// Runs `op` under the write lock, queues its events in mutation order and
    /// delivers them once the lock is released.
    fn mutate<T, F>(&self, op: F) -> Result<T, CanvasError>
    where
        F: FnOnce(&mut CanvasState) -> Result<(T, Vec<CanvasEvent>), CanvasError>,
    {
        let value = {
            let mut state = self.inner.state.write();
            let (value, events) = op(&mut state)?;
            state.last_updated = Utc::now();
            for event in events {
                self.inner.dispatcher.enqueue(event);
            }
            value
        };
        self.inner.dispatcher.flush();
        Ok(value)
    }
}

impl fmt::Debug for Canvas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Canvas")
            .field("id", &self.inner.id)
            .field("created_at", &self.inner.created_at)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Canvas`].
#[derive(Debug, Default)]
pub struct CanvasBuilder {
    id: Option<CanvasId>,
    title: Option<String>,
    description: Option<String>,
    settings: Option<CanvasSettings>,
    dispatcher: Option<Arc<EventDispatcher>>,
}

impl CanvasBuilder {
    /// Uses a fixed ID instead of a random one.
    #[must_use]
    pub fn id(mut self, id: impl Into<CanvasId>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Sets the title.
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Overrides branch naming defaults.
    #[must_use]
    pub fn settings(mut self, settings: CanvasSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Shares an existing dispatcher instead of creating a private one.
    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<EventDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Builds an empty canvas.
    #[must_use]
    pub fn build(self) -> Canvas {
        let now = Utc::now();
        let manager = BranchManager::new(self.settings.unwrap_or_default());
        let id = self.id.unwrap_or_else(CanvasId::generate);
        info!(canvas_id = %id, "Canvas created");
        Canvas::assemble(
            id,
            now,
            self.dispatcher.unwrap_or_default(),
            CanvasState {
                manager,
                title: self.title,
                description: self.description,
                last_updated: now,
            },
        )
    }

    /// Rebuilds a canvas from exported data.
    ///
    /// The builder's ID, title and description are ignored in favour of the
    /// values in `data`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if the data is structurally inconsistent.
    pub fn import(self, data: CanvasData) -> Result<Canvas, CanvasError> {
        data::import(data, self.settings.unwrap_or_default(), self.dispatcher.unwrap_or_default())
    }
}

impl Canvas {
    fn assemble(
        id: CanvasId,
        created_at: DateTime<Utc>,
        dispatcher: Arc<EventDispatcher>,
        state: CanvasState,
    ) -> Self {
        Self {
            inner: Arc::new(CanvasInner {
                id,
                created_at,
                dispatcher,
                state: RwLock::new(state),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn new_canvas_has_active_empty_main() -> Result<(), CanvasError> {
        let canvas = Canvas::new(None, Some("Demo".into()), None);
        assert_eq!(canvas.current_branch(), "main");
        assert_eq!(canvas.get_head_node(None)?, None);
        assert_eq!(canvas.title().as_deref(), Some("Demo"));
        assert_eq!(canvas.node_count(), 0);
        Ok(())
    }

    #[test]
    fn commit_publishes_after_lock_release() -> Result<(), CanvasError> {
        let canvas = Canvas::new(Some(CanvasId::from("c1")), None, None);
        let reader = canvas.clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        canvas.subscribe(move |event| {
            // Reading back from inside a callback must not deadlock.
            log.lock().push((event.kind(), reader.node_count()));
        });

        let main = canvas.checkout(CheckoutOptions::new())?;
        main.commit_message(Message::user("hello"), None)?;

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0.as_str(), "commit_message");
        assert_eq!(seen[0].1, 1);
        Ok(())
    }

    #[test]
    fn failed_mutation_publishes_nothing() {
        let canvas = Canvas::new(None, None, None);
        let seen = Arc::new(Mutex::new(0usize));
        let log = Arc::clone(&seen);
        canvas.subscribe(move |_| *log.lock() += 1);

        let result = canvas.update_message(&NodeId::from("ghost"), Message::user("x"), None);
        assert!(matches!(result, Err(CanvasError::NotFound(_))));
        assert_eq!(*seen.lock(), 0);
    }

    #[test]
    fn merge_emits_commit_then_back_link_updates() -> Result<(), CanvasError> {
        let canvas = Canvas::new(None, None, None);
        let main = canvas.checkout(CheckoutOptions::new())?;
        main.commit_message(Message::user("root"), None)?;
        let feature = canvas.checkout(CheckoutOptions::branch("feature").create_if_not_exists(true))?;
        let donor = feature.commit_message(Message::assistant("alt"), None)?;

        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        canvas.subscribe(move |event| {
            log.lock().push((event.kind().as_str(), event.node().map(|n| n.id.clone())));
        });

        let merged = main.merge_from(&["feature"], Message::system("merged"))?;

        let seen = seen.lock();
        assert_eq!(seen.len(), 2);
        assert_eq!(seen[0], ("commit_message", Some(merged.id.clone())));
        assert_eq!(seen[1], ("update_message", Some(donor.id)));
        Ok(())
    }

    #[test]
    fn branch_handle_does_not_switch_active() -> Result<(), CanvasError> {
        let canvas = Canvas::new(None, None, None);
        canvas.checkout(CheckoutOptions::branch("side").create_if_not_exists(true))?;
        canvas.checkout(CheckoutOptions::branch("main"))?;

        let side = canvas.branch("side")?;
        side.commit_message(Message::user("x"), None)?;
        assert_eq!(canvas.current_branch(), "main");
        assert!(canvas.branch("ghost").is_err());
        Ok(())
    }

    #[test]
    fn checkout_of_active_branch_is_read_only() -> Result<(), CanvasError> {
        let canvas = Canvas::new(None, None, None);
        let before = canvas.last_updated();
        std::thread::sleep(std::time::Duration::from_millis(5));

        let main = canvas.checkout(CheckoutOptions::new())?;
        assert_eq!(main.name(), "main");
        assert_eq!(canvas.last_updated(), before);
        Ok(())
    }

    #[test]
    fn panicking_subscriber_does_not_fail_the_commit() -> Result<(), CanvasError> {
        let canvas = Canvas::new(None, None, None);
        canvas.subscribe(|_| panic!("subscriber failure"));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen);
        canvas.subscribe(move |event| log.lock().push(event.kind()));

        let main = canvas.checkout(CheckoutOptions::new())?;
        let node = main.commit_message(Message::user("hello"), None)?;
        assert_eq!(main.head()?, Some(node.id.clone()));
        assert_eq!(canvas.get_node(&node.id), Some(node));

        canvas.checkout(CheckoutOptions::branch("side").create_if_not_exists(true))?;
        canvas.commit_message("side", Message::assistant("alt"), None)?;
        let merged = main.merge_from(&["side"], Message::system("merge"))?;
        assert_eq!(main.head()?, Some(merged.id));

        assert_eq!(
            seen.lock().iter().map(|k| k.as_str()).collect::<Vec<_>>(),
            vec!["commit_message", "commit_message", "commit_message", "update_message"]
        );
        Ok(())
    }

    #[test]
    fn update_details_keeps_unset_fields() {
        let canvas = Canvas::builder().title("T").description("D").build();
        let before = canvas.last_updated();
        canvas.update_details(Some("T2".into()), None);
        assert_eq!(canvas.title().as_deref(), Some("T2"));
        assert_eq!(canvas.description().as_deref(), Some("D"));
        assert!(canvas.last_updated() >= before);
    }
}
