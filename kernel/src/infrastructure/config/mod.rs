//! Configuration management for the canvas kernel.
//!
//! Settings come from built-in defaults overlaid with `CANVAS__*`
//! environment variables, e.g. `CANVAS__CANVAS__DEFAULT_BRANCH=trunk`.
//!
//! # Example
//!
//! ```
//! use canvas_kernel::infrastructure::config::Settings;
//!
//! let settings = Settings::new().expect("Failed to load configuration");
//! assert!(!settings.canvas.default_branch.is_empty());
//! ```

pub mod canvas;
pub mod telemetry;

pub use canvas::CanvasSettings;
pub use telemetry::TelemetrySettings;

use config::{Config, ConfigError, Environment};
use serde::Deserialize;

/// Top-level configuration for the canvas kernel.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Telemetry settings.
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    /// Canvas defaults.
    #[serde(default)]
    pub canvas: CanvasSettings,
}

impl Settings {
    /// Creates a new settings instance from environment variables and defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be built or deserialized.
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Start with default values
            .set_default("telemetry.service_name", "canvas-kernel")?
            .set_default("telemetry.log_level", telemetry::default_log_level())?
            .set_default("telemetry.json", false)?
            // Merge in Environment variables
            .add_source(
                Environment::with_prefix("CANVAS")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        s.try_deserialize()
    }
}
