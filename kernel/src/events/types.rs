//! Event payloads published by canvases and registries.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::canvas::{CanvasId, CanvasSummary};
use crate::graph::{MessageNode, NodeId};

/// A mutation notification, tagged on `event_type` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum CanvasEvent {
    /// A node was appended to a branch, including merge nodes.
    CommitMessage {
        /// Owning canvas.
        canvas_id: CanvasId,
        /// When the mutation happened.
        timestamp: DateTime<Utc>,
        /// The new node.
        data: MessageNode,
    },
    /// A node's content, metadata or child list changed.
    UpdateMessage {
        /// Owning canvas.
        canvas_id: CanvasId,
        /// When the mutation happened.
        timestamp: DateTime<Utc>,
        /// The node after the change.
        data: MessageNode,
    },
    /// A node was removed. Reserved: no core operation removes nodes.
    DeleteMessage {
        /// Owning canvas.
        canvas_id: CanvasId,
        /// When the mutation happened.
        timestamp: DateTime<Utc>,
        /// Removed node id.
        data: NodeId,
    },
    /// A canvas joined a registry.
    CanvasCreated {
        /// The new canvas.
        canvas_id: CanvasId,
        /// When the canvas was registered.
        timestamp: DateTime<Utc>,
        /// Summary at creation time.
        data: CanvasSummary,
    },
    /// A canvas left a registry.
    CanvasDeleted {
        /// The removed canvas.
        canvas_id: CanvasId,
        /// When the canvas was removed.
        timestamp: DateTime<Utc>,
        /// Id of the removed canvas.
        data: CanvasId,
    },
}

/// Discriminant of a [`CanvasEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// See [`CanvasEvent::CommitMessage`].
    CommitMessage,
    /// See [`CanvasEvent::UpdateMessage`].
    UpdateMessage,
    /// See [`CanvasEvent::DeleteMessage`].
    DeleteMessage,
    /// See [`CanvasEvent::CanvasCreated`].
    CanvasCreated,
    /// See [`CanvasEvent::CanvasDeleted`].
    CanvasDeleted,
}

impl EventKind {
    /// Wire name used in the `event_type` tag.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CommitMessage => "commit_message",
            Self::UpdateMessage => "update_message",
            Self::DeleteMessage => "delete_message",
            Self::CanvasCreated => "canvas_created",
            Self::CanvasDeleted => "canvas_deleted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CanvasEvent {
    /// `commit_message` stamped now.
    #[must_use]
    pub fn commit(canvas_id: CanvasId, node: MessageNode) -> Self {
        Self::CommitMessage {
            canvas_id,
            timestamp: Utc::now(),
            data: node,
        }
    }

    /// `update_message` stamped now.
    #[must_use]
    pub fn update(canvas_id: CanvasId, node: MessageNode) -> Self {
        Self::UpdateMessage {
            canvas_id,
            timestamp: Utc::now(),
            data: node,
        }
    }

    /// `delete_message` stamped now.
    #[must_use]
    pub fn delete(canvas_id: CanvasId, node_id: NodeId) -> Self {
        Self::DeleteMessage {
            canvas_id,
            timestamp: Utc::now(),
            data: node_id,
        }
    }

    /// `canvas_created` stamped now.
    #[must_use]
    pub fn canvas_created(summary: CanvasSummary) -> Self {
        Self::CanvasCreated {
            canvas_id: summary.canvas_id.clone(),
            timestamp: Utc::now(),
            data: summary,
        }
    }

    /// `canvas_deleted` stamped now.
    #[must_use]
    pub fn canvas_deleted(canvas_id: CanvasId) -> Self {
        Self::CanvasDeleted {
            canvas_id: canvas_id.clone(),
            timestamp: Utc::now(),
            data: canvas_id,
        }
    }

    /// Canvas the event belongs to.
    #[must_use]
    pub fn canvas_id(&self) -> &CanvasId {
        match self {
            Self::CommitMessage { canvas_id, .. }
            | Self::UpdateMessage { canvas_id, .. }
            | Self::DeleteMessage { canvas_id, .. }
            | Self::CanvasCreated { canvas_id, .. }
            | Self::CanvasDeleted { canvas_id, .. } => canvas_id,
        }
    }

    /// When the event was produced.
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            Self::CommitMessage { timestamp, .. }
            | Self::UpdateMessage { timestamp, .. }
            | Self::DeleteMessage { timestamp, .. }
            | Self::CanvasCreated { timestamp, .. }
            | Self::CanvasDeleted { timestamp, .. } => *timestamp,
        }
    }

    /// Event discriminant.
    #[must_use]
    pub fn kind(&self) -> EventKind {
        match self {
            Self::CommitMessage { .. } => EventKind::CommitMessage,
            Self::UpdateMessage { .. } => EventKind::UpdateMessage,
            Self::DeleteMessage { .. } => EventKind::DeleteMessage,
            Self::CanvasCreated { .. } => EventKind::CanvasCreated,
            Self::CanvasDeleted { .. } => EventKind::CanvasDeleted,
        }
    }

    /// Node carried by `commit_message` and `update_message`.
    #[must_use]
    pub fn node(&self) -> Option<&MessageNode> {
        match self {
            Self::CommitMessage { data, .. } | Self::UpdateMessage { data, .. } => Some(data),
            _ => None,
        }
    }
}
