//! Canvas configuration.

use crate::event::SerializableColor;
use crate::tools::{ToolKind, ToolStyle};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {message}")]
    Io { path: PathBuf, message: String },
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Settings for a canvas session. Missing fields fall back to defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanvasConfig {
    pub width: u32,
    pub height: u32,
    pub tool: ToolKind,
    pub color: SerializableColor,
    pub stroke_width: f64,
    /// WebSocket endpoint of the event store.
    pub event_store_url: String,
    /// Directory for file-backed drawings. `None` uses the platform data dir.
    pub storage_dir: Option<PathBuf>,
}

impl Default for CanvasConfig {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 800,
            tool: ToolKind::Brush,
            color: SerializableColor::black(),
            stroke_width: ToolStyle::DEFAULT_STROKE_WIDTH,
            event_store_url: "ws://127.0.0.1:3030/ws".to_string(),
            storage_dir: None,
        }
    }
}

impl CanvasConfig {
    /// Load from a JSON file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&json).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn style(&self) -> ToolStyle {
        ToolStyle::new(self.color, self.stroke_width)
    }
}
