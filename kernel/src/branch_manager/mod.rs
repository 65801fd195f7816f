//! Branch manager for the canvas kernel.
//!
//! This module provides the `BranchManager` and the branch domain types. It
//! holds no locks; [`Canvas`](crate::Canvas) serializes access to it.

pub mod core;
pub mod storage;
pub mod types;

pub use core::BranchManager;
pub use storage::BranchStorage;
pub use types::{BranchInfo, CheckoutOptions, MergeOutcome};
