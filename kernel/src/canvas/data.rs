//! Plain-data form of a canvas for export, import and listings.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{Canvas, CanvasId, CanvasState};
use crate::branch_manager::{BranchInfo, BranchManager};
use crate::error::CanvasError;
use crate::events::EventDispatcher;
use crate::graph::{MessageGraph, MessageNode, NodeId};
use crate::infrastructure::config::CanvasSettings;

/// Complete serializable snapshot of a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasData {
    /// Canvas identifier.
    pub canvas_id: CanvasId,
    /// Creation timestamp.
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    /// Optional title.
    #[serde(default)]
    pub title: Option<String>,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Time of the last mutation.
    #[serde(default = "Utc::now")]
    pub last_updated: DateTime<Utc>,
    /// Root node IDs in creation order.
    #[serde(default)]
    pub root_ids: Vec<NodeId>,
    /// Every node keyed by ID, in creation order.
    #[serde(default)]
    pub nodes: IndexMap<NodeId, MessageNode>,
    /// Branch records; absent in exports that only carry the graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branches: Option<Vec<BranchInfo>>,
    /// Active branch name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_branch: Option<String>,
}

/// Listing entry for a canvas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanvasSummary {
    /// Canvas identifier.
    pub canvas_id: CanvasId,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Optional title.
    pub title: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Root node IDs.
    pub root_ids: Vec<NodeId>,
    /// Number of nodes.
    pub node_count: usize,
    /// Number of branches.
    pub branch_count: usize,
    /// Time of the last mutation.
    pub last_updated: DateTime<Utc>,
}

impl Canvas {
    /// Exports the full state.
    #[must_use]
    pub fn to_canvas_data(&self) -> CanvasData {
        let state = self.inner.state.read();
        CanvasData {
            canvas_id: self.inner.id.clone(),
            created_at: self.inner.created_at,
            title: state.title.clone(),
            description: state.description.clone(),
            last_updated: state.last_updated,
            root_ids: state.manager.graph().root_ids().to_vec(),
            nodes: state.manager.graph().to_node_map(),
            branches: Some(state.manager.list_branches()),
            active_branch: Some(state.manager.active_branch().to_string()),
        }
    }

    /// Rebuilds a canvas with default settings and a private dispatcher.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` if keys disagree with node IDs, a reference
    /// does not resolve, a child does not list back to its parent, the root
    /// list is inconsistent, a parent chain loops, the branch list is empty or
    /// repeats a name, or the active branch is not in it.
    pub fn from_canvas_data(data: CanvasData) -> Result<Self, CanvasError> {
        Self::builder().import(data)
    }

    /// Exports the full state as a JSON string.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if encoding fails.
    pub fn to_json(&self) -> Result<String, CanvasError> {
        Ok(serde_json::to_string(&self.to_canvas_data())?)
    }

    /// Parses and imports a JSON export.
    ///
    /// # Errors
    ///
    /// Returns `Serialization` for malformed JSON and `InvalidArgument` for
    /// inconsistent data.
    pub fn from_json(json: &str) -> Result<Self, CanvasError> {
        Self::from_canvas_data(serde_json::from_str(json)?)
    }
}

pub(super) fn import(
    data: CanvasData,
    settings: CanvasSettings,
    dispatcher: Arc<EventDispatcher>,
) -> Result<Canvas, CanvasError> {
    let graph = MessageGraph::from_parts(data.nodes, data.root_ids)?;
    let manager = BranchManager::from_parts(
        graph,
        data.branches,
        data.active_branch,
        settings,
    )?;
    info!(
        canvas_id = %data.canvas_id,
        node_count = manager.graph().len(),
        branch_count = manager.branch_count(),
        "Canvas imported"
    );
    Ok(Canvas::assemble(
        data.canvas_id,
        data.created_at,
        dispatcher,
        CanvasState {
            manager,
            title: data.title,
            description: data.description,
            last_updated: data.last_updated,
        },
    ))
}
