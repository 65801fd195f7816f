//! Message node records and identifiers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;

use super::message::Message;

/// Free-form node metadata.
pub type Meta = serde_json::Map<String, Value>;

/// Metadata key holding the creation timestamp.
pub const META_TIMESTAMP: &str = "timestamp";
/// Metadata key refreshed by every content update.
pub const META_LAST_UPDATED: &str = "last_updated";
/// Metadata key listing the branches a merge node joined.
pub const META_MERGE_SOURCES: &str = "merge_sources";

/// Message node identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(String);

impl NodeId {
    /// Creates a node ID from a string.
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

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NodeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A message stored in the graph.
///
/// `parent_id` is the canonical lineage edge. Merge nodes additionally appear
/// in the `child_ids` of every merged branch head, so a node may be listed as
/// a child by more than one node while naming only one parent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageNode {
    /// Node ID.
    pub id: NodeId,
    /// Message payload.
    pub message: Message,
    /// Parent node, `None` for roots.
    pub parent_id: Option<NodeId>,
    /// Children in the order they were attached.
    #[serde(default)]
    pub child_ids: Vec<NodeId>,
    /// Node metadata.
    #[serde(default, deserialize_with = "meta_or_default")]
    pub meta: Meta,
}

impl MessageNode {
    /// Creation timestamp recorded in the metadata, if parseable.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.meta.get(META_TIMESTAMP)?)
    }

    /// Last update timestamp recorded in the metadata, if any.
    #[must_use]
    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(self.meta.get(META_LAST_UPDATED)?)
    }

    /// Whether this node is a root of the graph.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }
}

fn meta_or_default<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Meta, D::Error> {
    Ok(Option::<Meta>::deserialize(deserializer)?.unwrap_or_default())
}

/// Encodes a timestamp the way node metadata stores it.
#[must_use]
pub fn timestamp_value(at: DateTime<Utc>) -> Value {
    Value::String(at.to_rfc3339())
}

fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.as_str()?)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
