//! Initial viewer settings, loadable from JSON.

use crate::error::ConfigError;
use crate::viewport::ZoomLimits;

use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerSettings {
    /// Requested slice; out of range means "let the volume decide".
    pub slice_index: i64,
    pub window_width: f64,
    pub window_center: f64,
    pub zoom: f64,
    pub show_grid: bool,
    pub zoom_limits: ZoomLimits,
}

impl Default for ViewerSettings {
    fn default() -> Self {
        Self {
            slice_index: -1,
            window_width: 2000.0,
            window_center: 0.0,
            zoom: 1.0,
            show_grid: true,
            zoom_limits: ZoomLimits::default(),
        }
    }
}

impl ViewerSettings {
    /// Parse and validate settings. Missing fields keep their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&json)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.zoom_limits.validate()
    }
}
