//! Branch handles.

use std::fmt;

use super::Canvas;
use crate::branch_manager::BranchInfo;
use crate::error::CanvasError;
use crate::graph::{Message, MessageNode, Meta, NodeId};

/// A named pointer into a canvas, returned by [`Canvas::checkout`].
///
/// Handles hold no node data: every call goes through the canvas, so all
/// handles of a canvas observe the same graph. A handle outlives its branch;
/// after `delete_branch` its operations fail with `BranchNotFound`.
#[derive(Clone)]
pub struct Branch {
    canvas: Canvas,
    name: String,
}

impl Branch {
    pub(super) fn new(canvas: Canvas, name: String) -> Self {
        Self { canvas, name }
    }

    /// Branch name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Owning canvas.
    #[must_use]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Current branch record.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch was deleted.
    pub fn info(&self) -> Result<BranchInfo, CanvasError> {
        self.canvas
            .inner
            .state
            .read()
            .manager
            .branch(&self.name)
            .cloned()
    }

    /// HEAD node ID, `None` while the branch is empty.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch was deleted.
    pub fn head(&self) -> Result<Option<NodeId>, CanvasError> {
        Ok(self.info()?.head_node_id)
    }

    /// HEAD node snapshot.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch was deleted.
    pub fn head_node(&self) -> Result<Option<MessageNode>, CanvasError> {
        self.canvas.get_head_node(Some(&self.name))
    }

    /// Appends `message` as a child of HEAD (or as a new root) and advances
    /// HEAD to it.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch was deleted.
    pub fn commit_message(
        &self,
        message: Message,
        meta: Option<Meta>,
    ) -> Result<MessageNode, CanvasError> {
        self.canvas.commit_message(&self.name, message, meta)
    }

    /// Replaces the content of any node in the canvas. No HEAD moves.
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
        self.canvas.update_message(id, message, meta)
    }

    /// Merges the HEADs of `sources` into this branch.
    ///
    /// # Errors
    ///
    /// As [`Canvas::merge`].
    pub fn merge_from<S: AsRef<str>>(
        &self,
        sources: &[S],
        message: Message,
    ) -> Result<MessageNode, CanvasError> {
        self.canvas.merge(sources, message, &self.name)
    }

    /// Linear conversation up to HEAD, root first. Empty for an empty branch.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch was deleted.
    pub fn history(&self) -> Result<Vec<MessageNode>, CanvasError> {
        let state = self.canvas.inner.state.read();
        match &state.manager.branch(&self.name)?.head_node_id {
            Some(head) => state.manager.graph().ancestry(head),
            None => Ok(Vec::new()),
        }
    }
}

impl fmt::Debug for Branch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Branch")
            .field("canvas_id", self.canvas.id())
            .field("name", &self.name)
            .finish()
    }
}
