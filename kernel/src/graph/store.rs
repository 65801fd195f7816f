//! Message graph storage.
//!
//! The graph is an arena of [`MessageNode`] records keyed by [`NodeId`].
//! Everything outside this module refers to nodes by ID and receives clones,
//! so there is exactly one mutable copy of every node.

use chrono::Utc;
use indexmap::IndexMap;
use tracing::debug;

use super::message::Message;
use super::node::{timestamp_value, MessageNode, Meta, NodeId, META_TIMESTAMP};
use crate::error::CanvasError;

/// Node storage with parent/child adjacency and a root list.
///
/// Not synchronized: the owning canvas serializes access.
#[derive(Debug, Clone, Default)]
pub struct MessageGraph {
    nodes: IndexMap<NodeId, MessageNode>,
    root_ids: Vec<NodeId>,
}

impl MessageGraph {
    /// Creates an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a graph from exported parts, checking structural consistency.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if a map key disagrees with its node ID, a
    /// referenced node is missing, a child does not list back to its parent,
    /// a root has a parent or repeats, a parentless node is not a root, or a
    /// parent chain loops.
    pub fn from_parts(
        nodes: IndexMap<NodeId, MessageNode>,
        root_ids: Vec<NodeId>,
    ) -> Result<Self, CanvasError> {
        for (key, node) in &nodes {
            if key != &node.id {
                return Err(CanvasError::InvalidArgument(format!(
                    "node stored under '{key}' has id '{}'",
                    node.id
                )));
            }
            if let Some(parent_id) = &node.parent_id {
                let parent = nodes.get(parent_id).ok_or_else(|| {
                    CanvasError::InvalidArgument(format!(
                        "node '{key}' references missing parent '{parent_id}'"
                    ))
                })?;
                if !parent.child_ids.contains(key) {
                    return Err(CanvasError::InvalidArgument(format!(
                        "parent '{parent_id}' does not list child '{key}'"
                    )));
                }
            }
            if let Some(missing) = node.child_ids.iter().find(|c| !nodes.contains_key(*c)) {
                return Err(CanvasError::InvalidArgument(format!(
                    "node '{key}' references missing child '{missing}'"
                )));
            }
        }

        for root in &root_ids {
            match nodes.get(root) {
                None => {
                    return Err(CanvasError::InvalidArgument(format!(
                        "root '{root}' does not exist"
                    )))
                }
                Some(node) if node.parent_id.is_some() => {
                    return Err(CanvasError::InvalidArgument(format!(
                        "root '{root}' has a parent"
                    )))
                }
                Some(_) => {}
            }
        }
        for (i, root) in root_ids.iter().enumerate() {
            if root_ids[..i].contains(root) {
                return Err(CanvasError::InvalidArgument(format!(
                    "root '{root}' is listed twice"
                )));
            }
        }
        if let Some(orphan) = nodes
            .values()
            .find(|n| n.parent_id.is_none() && !root_ids.contains(&n.id))
        {
            return Err(CanvasError::InvalidArgument(format!(
                "parentless node '{}' is missing from root_ids",
                orphan.id
            )));
        }

        let graph = Self { nodes, root_ids };
        for id in graph.nodes.keys() {
            graph.check_acyclic(id)?;
        }
        Ok(graph)
    }

    fn check_acyclic(&self, start: &NodeId) -> Result<(), CanvasError> {
        let mut current = self.nodes.get(start).and_then(|n| n.parent_id.as_ref());
        let mut steps = 0usize;
        while let Some(id) = current {
            steps += 1;
            if steps > self.nodes.len() {
                return Err(CanvasError::InvalidArgument(format!(
                    "parent chain of '{start}' contains a cycle"
                )));
            }
            current = self.nodes.get(id).and_then(|n| n.parent_id.as_ref());
        }
        Ok(())
    }

    /// Inserts a new node.
    ///
    /// With a parent, the new ID is appended to the parent's `child_ids`;
    /// otherwise it becomes a new root. A creation timestamp is added to the
    /// metadata when absent.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `parent_id` does not resolve, or
    /// `InvalidArgument` if an explicit `id` is already taken.
    pub fn create_node(
        &mut self,
        message: Message,
        parent_id: Option<&NodeId>,
        meta: Option<Meta>,
        id: Option<NodeId>,
    ) -> Result<MessageNode, CanvasError> {
        let id = id.unwrap_or_else(NodeId::generate);
        if self.nodes.contains_key(&id) {
            return Err(CanvasError::InvalidArgument(format!(
                "node '{id}' already exists"
            )));
        }
        if let Some(parent) = parent_id {
            if !self.nodes.contains_key(parent) {
                return Err(CanvasError::NotFound(parent.clone()));
            }
        }

        let mut meta = meta.unwrap_or_default();
        meta.entry(META_TIMESTAMP)
            .or_insert_with(|| timestamp_value(Utc::now()));

        let node = MessageNode {
            id: id.clone(),
            message,
            parent_id: parent_id.cloned(),
            child_ids: Vec::new(),
            meta,
        };

        match parent_id.and_then(|p| self.nodes.get_mut(p)) {
            Some(parent) => parent.child_ids.push(id.clone()),
            None => self.root_ids.push(id.clone()),
        }
        self.nodes.insert(id.clone(), node.clone());

        debug!(node_id = %id, parent_id = ?parent_id.map(NodeId::as_str), "Node created");
        Ok(node)
    }

    /// Looks up a node.
    #[must_use]
    pub fn get_node(&self, id: &NodeId) -> Option<&MessageNode> {
        self.nodes.get(id)
    }

    /// Whether a node exists.
    #[must_use]
    pub fn contains(&self, id: &NodeId) -> bool {
        self.nodes.contains_key(id)
    }

    /// Overwrites a node's message and metadata.
    ///
    /// The stored `id`, `parent_id` and `child_ids` are kept whatever
    /// `new_node` says: a node never moves once created.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `id` is absent.
    pub fn replace_node(
        &mut self,
        id: &NodeId,
        new_node: MessageNode,
    ) -> Result<MessageNode, CanvasError> {
        let stored = self
            .nodes
            .get_mut(id)
            .ok_or_else(|| CanvasError::NotFound(id.clone()))?;
        stored.message = new_node.message;
        stored.meta = new_node.meta;

        debug!(node_id = %id, "Node replaced");
        Ok(stored.clone())
    }

    /// Records `child` in `parent.child_ids` without touching `child`.
    ///
    /// Returns `false` if the link was already present.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if either node is absent.
    pub fn link_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<bool, CanvasError> {
        if !self.nodes.contains_key(child) {
            return Err(CanvasError::NotFound(child.clone()));
        }
        let parent_node = self
            .nodes
            .get_mut(parent)
            .ok_or_else(|| CanvasError::NotFound(parent.clone()))?;
        if parent_node.child_ids.contains(child) {
            return Ok(false);
        }
        parent_node.child_ids.push(child.clone());
        debug!(parent_id = %parent, child_id = %child, "Back-link recorded");
        Ok(true)
    }

    /// Path from the root down to `id`, following `parent_id`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `id` is absent.
    pub fn ancestry(&self, id: &NodeId) -> Result<Vec<MessageNode>, CanvasError> {
        let mut path = Vec::new();
        let mut current = Some(
            self.nodes
                .get(id)
                .ok_or_else(|| CanvasError::NotFound(id.clone()))?,
        );
        while let Some(node) = current {
            path.push(node.clone());
            current = node.parent_id.as_ref().and_then(|p| self.nodes.get(p));
        }
        path.reverse();
        Ok(path)
    }

    /// Iterates nodes in insertion order.
    pub fn nodes(&self) -> impl Iterator<Item = &MessageNode> {
        self.nodes.values()
    }

    /// Root node IDs in creation order.
    #[must_use]
    pub fn root_ids(&self) -> &[NodeId] {
        &self.root_ids
    }

    /// Number of nodes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the graph has no nodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Clones the node map for export.
    #[must_use]
    pub fn to_node_map(&self) -> IndexMap<NodeId, MessageNode> {
        self.nodes.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_nodes_are_tracked() -> Result<(), CanvasError> {
        let mut graph = MessageGraph::new();
        let a = graph.create_node(Message::user("a"), None, None, None)?;
        let b = graph.create_node(Message::user("b"), None, None, None)?;
        assert_eq!(graph.root_ids(), &[a.id, b.id]);
        assert_eq!(graph.len(), 2);
        Ok(())
    }

    #[test]
    fn child_is_appended_to_parent() -> Result<(), CanvasError> {
        let mut graph = MessageGraph::new();
        let root = graph.create_node(Message::user("q"), None, None, None)?;
        let first = graph.create_node(Message::assistant("a1"), Some(&root.id), None, None)?;
        let second = graph.create_node(Message::assistant("a2"), Some(&root.id), None, None)?;

        let stored = graph.get_node(&root.id).ok_or(CanvasError::NotFound(root.id.clone()))?;
        assert_eq!(stored.child_ids, vec![first.id, second.id.clone()]);
        assert_eq!(second.parent_id, Some(root.id));
        assert_eq!(graph.root_ids().len(), 1);
        Ok(())
    }

    #[test]
    fn missing_parent_is_rejected_without_mutation() {
        let mut graph = MessageGraph::new();
        let result = graph.create_node(Message::user("x"), Some(&NodeId::from("ghost")), None, None);
        assert!(matches!(result, Err(CanvasError::NotFound(_))));
        assert!(graph.is_empty());
        assert!(graph.root_ids().is_empty());
    }

    #[test]
    fn duplicate_explicit_id_is_rejected() -> Result<(), CanvasError> {
        let mut graph = MessageGraph::new();
        graph.create_node(Message::user("x"), None, None, Some(NodeId::from("n1")))?;
        let result = graph.create_node(Message::user("y"), None, None, Some(NodeId::from("n1")));
        assert!(matches!(result, Err(CanvasError::InvalidArgument(_))));
        assert_eq!(graph.len(), 1);
        Ok(())
    }

    #[test]
    fn creation_timestamp_is_added_but_not_overwritten() -> Result<(), CanvasError> {
        let mut graph = MessageGraph::new();
        let node = graph.create_node(Message::user("x"), None, None, None)?;
        assert!(node.created_at().is_some());

        let mut meta = Meta::new();
        meta.insert(META_TIMESTAMP.into(), "2024-01-01T00:00:00+00:00".into());
        meta.insert("model".into(), "test".into());
        let node = graph.create_node(Message::user("y"), None, Some(meta), None)?;
        assert_eq!(node.meta[META_TIMESTAMP], "2024-01-01T00:00:00+00:00");
        assert_eq!(node.meta["model"], "test");
        Ok(())
    }

    #[test]
    fn replace_preserves_structure() -> Result<(), CanvasError> {
        let mut graph = MessageGraph::new();
        let root = graph.create_node(Message::user("q"), None, None, None)?;
        let child = graph.create_node(Message::assistant("a"), Some(&root.id), None, None)?;

        let forged = MessageNode {
            id: NodeId::from("forged"),
            message: Message::user("edited"),
            parent_id: Some(child.id.clone()),
            child_ids: vec![NodeId::from("bogus")],
            meta: Meta::new(),
        };
        let replaced = graph.replace_node(&root.id, forged)?;

        assert_eq!(replaced.id, root.id);
        assert_eq!(replaced.parent_id, None);
        assert_eq!(replaced.child_ids, vec![child.id]);
        assert_eq!(replaced.message, Message::user("edited"));
        Ok(())
    }

    #[test]
    fn replace_missing_node_fails() {
        let mut graph = MessageGraph::new();
        let node = MessageNode {
            id: NodeId::from("x"),
            message: Message::user("x"),
            parent_id: None,
            child_ids: vec![],
            meta: Meta::new(),
        };
        assert!(matches!(
            graph.replace_node(&NodeId::from("x"), node),
            Err(CanvasError::NotFound(_))
        ));
    }

    #[test]
    fn link_child_is_idempotent() -> Result<(), CanvasError> {
        let mut graph = MessageGraph::new();
        let a = graph.create_node(Message::user("a"), None, None, None)?;
        let b = graph.create_node(Message::user("b"), None, None, None)?;
        assert!(graph.link_child(&a.id, &b.id)?);
        assert!(!graph.link_child(&a.id, &b.id)?);
        let a = graph.get_node(&a.id).ok_or(CanvasError::NotFound(a.id.clone()))?;
        assert_eq!(a.child_ids, vec![b.id.clone()]);
        // the linked node keeps its own parent
        assert_eq!(graph.get_node(&b.id).and_then(|n| n.parent_id.clone()), None);
        Ok(())
    }

    #[test]
    fn ancestry_is_root_first() -> Result<(), CanvasError> {
        let mut graph = MessageGraph::new();
        let a = graph.create_node(Message::user("a"), None, None, None)?;
        let b = graph.create_node(Message::assistant("b"), Some(&a.id), None, None)?;
        let c = graph.create_node(Message::user("c"), Some(&b.id), None, None)?;

        let path: Vec<NodeId> = graph.ancestry(&c.id)?.into_iter().map(|n| n.id).collect();
        assert_eq!(path, vec![a.id, b.id, c.id]);
        Ok(())
    }

    #[test]
    fn from_parts_rejects_missing_back_link() -> Result<(), CanvasError> {
        let mut graph = MessageGraph::new();
        let a = graph.create_node(Message::user("a"), None, None, None)?;
        graph.create_node(Message::user("b"), Some(&a.id), None, None)?;

        let mut nodes = graph.to_node_map();
        if let Some(parent) = nodes.get_mut(&a.id) {
            parent.child_ids.clear();
        }
        let result = MessageGraph::from_parts(nodes, graph.root_ids().to_vec());
        assert!(matches!(result, Err(CanvasError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn from_parts_requires_every_parentless_node_as_root() -> Result<(), CanvasError> {
        let mut graph = MessageGraph::new();
        graph.create_node(Message::user("a"), None, None, None)?;

        let result = MessageGraph::from_parts(graph.to_node_map(), Vec::new());
        assert!(matches!(result, Err(CanvasError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn from_parts_rejects_duplicate_roots() -> Result<(), CanvasError> {
        let mut graph = MessageGraph::new();
        let a = graph.create_node(Message::user("a"), None, None, None)?;

        let result = MessageGraph::from_parts(graph.to_node_map(), vec![a.id.clone(), a.id]);
        assert!(matches!(result, Err(CanvasError::InvalidArgument(_))));
        Ok(())
    }

    #[test]
    fn from_parts_rejects_cycles() {
        let node = |id: &str, parent: &str| MessageNode {
            id: NodeId::from(id),
            message: Message::user(id),
            parent_id: Some(NodeId::from(parent)),
            child_ids: vec![NodeId::from(parent)],
            meta: Meta::new(),
        };
        let mut nodes = IndexMap::new();
        nodes.insert(NodeId::from("a"), node("a", "b"));
        nodes.insert(NodeId::from("b"), node("b", "a"));

        let result = MessageGraph::from_parts(nodes, vec![]);
        assert!(matches!(result, Err(CanvasError::InvalidArgument(_))));
    }
}
