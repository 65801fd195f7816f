//! Branch storage for the canvas kernel.
//!
//! Keeps branch records in insertion order together with the active-branch
//! cursor. Synchronization is the owning canvas's job.

use indexmap::IndexMap;

use super::types::BranchInfo;

/// Storage for branch pointers.
#[derive(Debug, Clone)]
pub struct BranchStorage {
    branches: IndexMap<String, BranchInfo>,
    active: String,
}

impl BranchStorage {
    /// Creates storage holding only `default_branch`, which is active.
    pub fn new(default_branch: BranchInfo) -> Self {
        let active = default_branch.name.clone();
        let mut branches = IndexMap::new();
        branches.insert(active.clone(), default_branch);
        Self { branches, active }
    }

    /// Insert a branch, replacing any branch with the same name.
    pub fn insert_branch(&mut self, branch: BranchInfo) {
        self.branches.insert(branch.name.clone(), branch);
    }

    /// Get a branch by name.
    #[must_use]
    pub fn get_branch(&self, name: &str) -> Option<&BranchInfo> {
        self.branches.get(name)
    }

    /// Get a mutable reference to a branch.
    pub fn get_branch_mut(&mut self, name: &str) -> Option<&mut BranchInfo> {
        self.branches.get_mut(name)
    }

    /// Check if a branch exists.
    #[must_use]
    pub fn contains_branch(&self, name: &str) -> bool {
        self.branches.contains_key(name)
    }

    /// Remove a branch, keeping the order of the others.
    pub fn remove_branch(&mut self, name: &str) -> Option<BranchInfo> {
        self.branches.shift_remove(name)
    }

    /// All branches in creation order.
    pub fn branches(&self) -> impl Iterator<Item = &BranchInfo> {
        self.branches.values()
    }

    /// Number of branches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.branches.len()
    }

    /// Always `false` in practice: the active branch cannot be removed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.branches.is_empty()
    }

    /// Name of the active branch.
    #[must_use]
    pub fn active(&self) -> &str {
        &self.active
    }

    /// Moves the active cursor. Callers check existence first.
    pub fn set_active(&mut self, name: impl Into<String>) {
        self.active = name.into();
    }
}
