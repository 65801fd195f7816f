//! Canvas configuration for the canvas kernel.
//!
//! Names and capacities applied to every new canvas.

use serde::Deserialize;

/// Per-canvas defaults.
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct CanvasSettings {
    /// Branch created with every canvas (default: "main")
    #[serde(default = "default_branch")]
    pub default_branch: String,

    /// Description of the default branch
    #[serde(default = "default_branch_description")]
    pub default_branch_description: String,

    /// Prefix for synthesized detached branch names (default: "detached-")
    #[serde(default = "default_detached_prefix")]
    pub detached_prefix: String,

    /// Buffer size of the async event bridge (default: 256)
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for CanvasSettings {
    fn default() -> Self {
        Self {
            default_branch: default_branch(),
            default_branch_description: default_branch_description(),
            detached_prefix: default_detached_prefix(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_branch() -> String {
    "main".to_string()
}

fn default_branch_description() -> String {
    "Main conversation thread".to_string()
}

fn default_detached_prefix() -> String {
    "detached-".to_string()
}

fn default_event_channel_capacity() -> usize {
    256
}
