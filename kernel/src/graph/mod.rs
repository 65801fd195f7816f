//! Message graph for the canvas kernel.
//!
//! Owns node storage only; branches live in
//! [`branch_manager`](crate::branch_manager).

pub mod message;
pub mod node;
pub mod store;

pub use message::{Content, ContentBlock, Message, Role, TextBlock, ToolResultBlock, ToolUseBlock};
pub use node::{
    timestamp_value, MessageNode, Meta, NodeId, META_LAST_UPDATED, META_MERGE_SOURCES,
    META_TIMESTAMP,
};
pub use store::MessageGraph;
