//! Error types for canvas operations.

use thiserror::Error;

use crate::graph::NodeId;

/// Errors raised by graph, branch and canvas operations.
///
/// Every operation validates before it mutates, so an `Err` always means the
/// canvas was left untouched.
#[derive(Debug, Error)]
pub enum CanvasError {
    /// Referenced message node does not exist.
    #[error("Message not found: {0}")]
    NotFound(NodeId),
    /// Referenced branch does not exist.
    #[error("Branch not found: {0}")]
    BranchNotFound(String),
    /// Malformed call, e.g. an empty source list for a merge.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    /// Operation not permitted in the current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),
    /// JSON encoding or decoding failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CanvasError {
    /// HTTP status code a transport layer should answer with.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::NotFound(_) | Self::BranchNotFound(_) => 404,
            Self::InvalidArgument(_) | Self::InvalidState(_) => 400,
            Self::Serialization(_) => 500,
        }
    }

    /// Machine-readable error code for API responses.
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "message_not_found",
            Self::BranchNotFound(_) => "branch_not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::InvalidState(_) => "invalid_state",
            Self::Serialization(_) => "serialization_error",
        }
    }
}
