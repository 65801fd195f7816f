//! Canvas Kernel - version-controlled conversation graphs.
//!
//! This crate models LLM conversations as a directed acyclic graph of
//! messages with named branches, detached checkouts, commits, in-place
//! updates and multi-parent merges. Every mutation is announced through an
//! event dispatcher so transports (SSE streams, loggers, tests) can observe
//! the graph without the core knowing about them.

#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Branch pointers and the checkout/commit/merge algorithms.
pub mod branch_manager;
/// Canvas aggregate, branch handles and the plain-data wire format.
pub mod canvas;
/// Error types shared by every layer.
pub mod error;
/// Event types, dispatcher and async broadcaster.
pub mod events;
/// Message graph storage and message payload types.
pub mod graph;
/// Infrastructure components (config, telemetry).
pub mod infrastructure;
/// Explicit multi-canvas registry.
pub mod registry;

pub use branch_manager::{BranchInfo, CheckoutOptions};
pub use canvas::{Branch, Canvas, CanvasBuilder, CanvasData, CanvasId, CanvasSummary};
pub use error::CanvasError;
pub use events::{CanvasEvent, EventBroadcaster, EventDispatcher, SubscriptionId};
pub use graph::{Content, ContentBlock, Message, MessageGraph, MessageNode, Meta, NodeId, Role};
pub use registry::CanvasRegistry;
