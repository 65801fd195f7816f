//! Core branch manager for the canvas kernel.
//!
//! This module provides the `BranchManager` which combines branch pointer
//! bookkeeping with graph mutation. It holds no locks; the canvas wraps it in
//! a single `RwLock`, so every operation here is atomic to readers.

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};

use super::storage::BranchStorage;
use super::types::{BranchInfo, CheckoutOptions, MergeOutcome};
use crate::error::CanvasError;
use crate::graph::{
    timestamp_value, Message, MessageGraph, MessageNode, Meta, NodeId, META_LAST_UPDATED,
    META_MERGE_SOURCES,
};
use crate::infrastructure::config::CanvasSettings;

/// Manager for branch operations over a message graph.
#[derive(Debug, Clone)]
pub struct BranchManager {
    graph: MessageGraph,
    storage: BranchStorage,
    settings: CanvasSettings,
}

impl BranchManager {
    /// Creates an empty graph with the default branch (null HEAD) active.
    #[must_use]
    pub fn new(settings: CanvasSettings) -> Self {
        let default_branch = BranchInfo::new(
            settings.default_branch.clone(),
            Some(settings.default_branch_description.clone()),
            None,
        );
        Self {
            graph: MessageGraph::new(),
            storage: BranchStorage::new(default_branch),
            settings,
        }
    }

    /// Rebuilds a manager from an imported graph and branch list.
    ///
    /// With `branches`, exactly those branches are restored in their exported
    /// order and `active` must name one of them (the first is used when
    /// absent). Without `branches`, only a fresh default branch is created.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for an empty or duplicated branch list, heads
    /// that do not resolve, or an `active` name that is not a branch.
    pub fn from_parts(
        graph: MessageGraph,
        branches: Option<Vec<BranchInfo>>,
        active: Option<String>,
        settings: CanvasSettings,
    ) -> Result<Self, CanvasError> {
        let Some(branches) = branches else {
            if let Some(name) = active.filter(|name| *name != settings.default_branch) {
                return Err(CanvasError::InvalidArgument(format!(
                    "active branch '{name}' is not a branch"
                )));
            }
            let mut manager = Self::new(settings);
            manager.graph = graph;
            return Ok(manager);
        };

        let mut records = branches.into_iter();
        let first = records.next().ok_or_else(|| {
            CanvasError::InvalidArgument("branch list must not be empty".to_string())
        })?;
        let mut storage = BranchStorage::new(first);
        for branch in records {
            if storage.contains_branch(&branch.name) {
                return Err(CanvasError::InvalidArgument(format!(
                    "duplicate branch '{}'",
                    branch.name
                )));
            }
            storage.insert_branch(branch);
        }

        if let Some(branch) = storage.branches().find(|b| {
            b.head_node_id
                .as_ref()
                .is_some_and(|head| !graph.contains(head))
        }) {
            return Err(CanvasError::InvalidArgument(format!(
                "branch '{}' points at a missing node",
                branch.name
            )));
        }

        if let Some(name) = active {
            if !storage.contains_branch(&name) {
                return Err(CanvasError::InvalidArgument(format!(
                    "active branch '{name}' is not a branch"
                )));
            }
            storage.set_active(name);
        }

        Ok(Self {
            graph,
            storage,
            settings,
        })
    }

    /// The underlying graph.
    #[must_use]
    pub fn graph(&self) -> &MessageGraph {
        &self.graph
    }

    /// Name of the active branch.
    #[must_use]
    pub fn active_branch(&self) -> &str {
        self.storage.active()
    }

    /// Get a branch by name.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch does not exist.
    pub fn branch(&self, name: &str) -> Result<&BranchInfo, CanvasError> {
        self.storage
            .get_branch(name)
            .ok_or_else(|| CanvasError::BranchNotFound(name.to_string()))
    }

    /// All branches in creation order.
    #[must_use]
    pub fn list_branches(&self) -> Vec<BranchInfo> {
        self.storage.branches().cloned().collect()
    }

    /// Number of branches.
    #[must_use]
    pub fn branch_count(&self) -> usize {
        self.storage.len()
    }

    /// Resolves a checkout request and returns the branch name to hand out.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` when a missing branch may not be created,
    /// `NotFound` when `start_from_node` does not resolve, and
    /// `InvalidArgument` for an empty name.
    pub fn checkout(&mut self, opts: &CheckoutOptions) -> Result<String, CanvasError> {
        match (&opts.name, &opts.start_from_node) {
            (None, Some(node)) => self.checkout_detached(node),
            (None, None) => Ok(self.storage.active().to_string()),
            (Some(name), _) if self.storage.contains_branch(name) => {
                self.storage.set_active(name.clone());
                debug!(branch = %name, "Switched active branch");
                Ok(name.clone())
            }
            (Some(name), _) if !opts.create_if_not_exists => {
                Err(CanvasError::BranchNotFound(name.clone()))
            }
            (Some(name), start) => {
                if name.trim().is_empty() {
                    return Err(CanvasError::InvalidArgument(
                        "branch name must not be empty".to_string(),
                    ));
                }
                let head = match start {
                    Some(node) => Some(self.require_node(node)?),
                    None => self.branch(self.storage.active())?.head_node_id.clone(),
                };
                let description = opts
                    .description
                    .clone()
                    .unwrap_or_else(|| format!("Branch {name}"));
                let branch = BranchInfo::new(name.clone(), Some(description), head);
                info!(
                    branch = %name,
                    head = ?branch.head_node_id.as_ref().map(NodeId::as_str),
                    "Branch created"
                );
                self.storage.insert_branch(branch);
                self.storage.set_active(name.clone());
                Ok(name.clone())
            }
        }
    }

    fn checkout_detached(&mut self, node: &NodeId) -> Result<String, CanvasError> {
        let head = self.require_node(node)?;
        let name = self.detached_name(|| uuid::Uuid::new_v4().simple().to_string());
        let mut branch = BranchInfo::new(
            name.clone(),
            Some(format!("Detached checkout at {head}")),
            Some(head),
        );
        branch.detached = true;
        info!(branch = %name, node_id = %node, "Detached checkout");
        self.storage.insert_branch(branch);
        self.storage.set_active(name.clone());
        Ok(name)
    }

    /// First prefixed name built from `suffix` that no branch uses yet.
    fn detached_name(&self, mut suffix: impl FnMut() -> String) -> String {
        loop {
            let raw = suffix();
            let short = raw.get(..8).unwrap_or(raw.as_str());
            let candidate = format!("{}{short}", self.settings.detached_prefix);
            if !self.storage.contains_branch(&candidate) {
                return candidate;
            }
        }
    }

    fn require_node(&self, id: &NodeId) -> Result<NodeId, CanvasError> {
        if self.graph.contains(id) {
            Ok(id.clone())
        } else {
            Err(CanvasError::NotFound(id.clone()))
        }
    }

    /// Appends a message on top of `branch` and advances its HEAD.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if the branch does not exist.
    pub fn commit(
        &mut self,
        branch: &str,
        message: Message,
        meta: Option<Meta>,
    ) -> Result<MessageNode, CanvasError> {
        let head = self.branch(branch)?.head_node_id.clone();
        let node = self.graph.create_node(message, head.as_ref(), meta, None)?;
        self.move_head(branch, &node.id);
        debug!(branch = %branch, node_id = %node.id, "Message committed");
        Ok(node)
    }

    /// Replaces a node's message, layering `meta` over the existing metadata
    /// and refreshing the last-updated timestamp. No HEAD moves.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the node does not exist.
    pub fn update_message(
        &mut self,
        id: &NodeId,
        message: Message,
        meta: Option<Meta>,
    ) -> Result<MessageNode, CanvasError> {
        let existing = self
            .graph
            .get_node(id)
            .ok_or_else(|| CanvasError::NotFound(id.clone()))?;

        let mut merged = existing.meta.clone();
        if let Some(extra) = meta {
            merged.extend(extra);
        }
        merged.insert(META_LAST_UPDATED.to_string(), timestamp_value(Utc::now()));

        let replacement = MessageNode {
            message,
            meta: merged,
            ..existing.clone()
        };
        let node = self.graph.replace_node(id, replacement)?;
        debug!(node_id = %id, "Message updated");
        Ok(node)
    }

    /// Joins the HEADs of `sources` into `target` with one new node.
    ///
    /// The merge node's `parent_id` is the target's HEAD; each distinct source
    /// HEAD records the merge node in its `child_ids`. Only the target's HEAD
    /// moves.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` for an unknown target or source,
    /// `InvalidArgument` for an empty source list, and `InvalidState` when a
    /// source has no commits. Nothing is mutated on error.
    pub fn merge(
        &mut self,
        sources: &[String],
        message: Message,
        target: &str,
    ) -> Result<MergeOutcome, CanvasError> {
        let target_head = self.branch(target)?.head_node_id.clone();
        if sources.is_empty() {
            return Err(CanvasError::InvalidArgument(
                "merge requires at least one source branch".to_string(),
            ));
        }

        let mut donor_heads: Vec<NodeId> = Vec::with_capacity(sources.len());
        for source in sources {
            let head = self.branch(source)?.head_node_id.clone().ok_or_else(|| {
                CanvasError::InvalidState(format!("source branch '{source}' has no commits"))
            })?;
            if !donor_heads.contains(&head) {
                donor_heads.push(head);
            }
        }

        let mut meta = Meta::new();
        meta.insert(
            META_MERGE_SOURCES.to_string(),
            Value::Array(sources.iter().cloned().map(Value::String).collect()),
        );
        let node = self
            .graph
            .create_node(message, target_head.as_ref(), Some(meta), None)?;

        let mut linked = Vec::new();
        for head in &donor_heads {
            if self.graph.link_child(head, &node.id)? {
                if let Some(donor) = self.graph.get_node(head) {
                    linked.push(donor.clone());
                }
            }
        }
        self.move_head(target, &node.id);

        info!(
            target = %target,
            sources = ?sources,
            node_id = %node.id,
            "Branches merged"
        );
        Ok(MergeOutcome { node, linked })
    }

    /// Removes a branch pointer. Nodes are never touched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` for the active branch and `BranchNotFound` for
    /// an unknown one.
    pub fn delete_branch(&mut self, name: &str) -> Result<BranchInfo, CanvasError> {
        if self.storage.active() == name {
            return Err(CanvasError::InvalidState(format!(
                "cannot delete the active branch '{name}'"
            )));
        }
        let removed = self
            .storage
            .remove_branch(name)
            .ok_or_else(|| CanvasError::BranchNotFound(name.to_string()))?;
        info!(branch = %name, "Branch deleted");
        Ok(removed)
    }

    /// Node at the HEAD of `name`, or of the active branch.
    ///
    /// # Errors
    ///
    /// Returns `BranchNotFound` if `name` is given and unknown.
    pub fn head_node(&self, name: Option<&str>) -> Result<Option<MessageNode>, CanvasError> {
        let branch = self.branch(name.unwrap_or_else(|| self.storage.active()))?;
        Ok(branch
            .head_node_id
            .as_ref()
            .and_then(|id| self.graph.get_node(id))
            .cloned())
    }

    fn move_head(&mut self, branch: &str, node: &NodeId) {
        if let Some(record) = self.storage.get_branch_mut(branch) {
            record.head_node_id = Some(node.clone());
        }
    }
}
