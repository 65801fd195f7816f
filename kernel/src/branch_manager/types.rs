//! Branch types for the canvas kernel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::{MessageNode, NodeId};

/// Summary of a branch: a named, movable pointer into the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Branch name, unique within a canvas.
    pub name: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Node currently checked out; `None` until the first commit.
    pub head_node_id: Option<NodeId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Synthesized by a detached checkout rather than named by a caller.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub detached: bool,
}

impl BranchInfo {
    /// Creates a named branch.
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        head_node_id: Option<NodeId>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            head_node_id,
            created_at: Utc::now(),
            detached: false,
        }
    }

    /// Whether the branch has no commits yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.head_node_id.is_none()
    }
}

/// Arguments for [`Canvas::checkout`](crate::Canvas::checkout).
///
/// ```
/// use canvas_kernel::CheckoutOptions;
///
/// let opts = CheckoutOptions::branch("feature")
///     .description("Alternative answer")
///     .create_if_not_exists(true);
/// assert_eq!(opts.name.as_deref(), Some("feature"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CheckoutOptions {
    /// Branch to check out; `None` means the active branch or a detached
    /// checkout when `start_from_node` is set.
    pub name: Option<String>,
    /// Description for a newly created branch.
    pub description: Option<String>,
    /// Create `name` when it does not exist.
    pub create_if_not_exists: bool,
    /// Starting node for a new or detached branch.
    pub start_from_node: Option<NodeId>,
}

impl CheckoutOptions {
    /// Checks out the active branch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks out a named branch.
    pub fn branch(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Detached checkout anchored at `node`.
    #[must_use]
    pub fn detached(node: NodeId) -> Self {
        Self {
            start_from_node: Some(node),
            ..Self::default()
        }
    }

    /// Sets the description used if the branch gets created.
    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Allows creating the branch.
    #[must_use]
    pub fn create_if_not_exists(mut self, create: bool) -> Self {
        self.create_if_not_exists = create;
        self
    }

    /// Sets the node a new branch starts from.
    #[must_use]
    pub fn start_from(mut self, node: NodeId) -> Self {
        self.start_from_node = Some(node);
        self
    }
}

/// Result of a merge.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// The merge node, child of the target's previous HEAD.
    pub node: MessageNode,
    /// Source HEAD nodes that gained a back-link to the merge node.
    pub linked: Vec<MessageNode>,
}
