//! Tool system for the shared canvas.

use crate::event::{EventError, SerializableColor};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available drawing tools.
///
/// Events produced elsewhere may name a tool this build does not know about;
/// those deserialize to [`ToolKind::Unknown`] so they survive a round trip and
/// render as no-ops. Local construction never accepts `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ToolKind {
    #[default]
    Brush,
    Eraser,
    Rectangle,
    Circle,
    Line,
    Unknown(String),
}

/// How a tool drives an interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolClass {
    /// Pointer-down starts a path, moves extend it, pointer-up ends it.
    Stroke,
    /// Pointer-down anchors, pointer-up commits one primitive.
    Shape,
    /// Not a tool this build understands.
    Unrecognized,
}

impl ToolKind {
    /// Every tool a participant can pick locally.
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Brush,
        ToolKind::Eraser,
        ToolKind::Rectangle,
        ToolKind::Circle,
        ToolKind::Line,
    ];

    /// Wire identifier of this tool.
    pub fn as_str(&self) -> &str {
        match self {
            ToolKind::Brush => "brush",
            ToolKind::Eraser => "eraser",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Circle => "circle",
            ToolKind::Line => "line",
            ToolKind::Unknown(name) => name,
        }
    }

    pub fn class(&self) -> ToolClass {
        match self {
            ToolKind::Brush | ToolKind::Eraser => ToolClass::Stroke,
            ToolKind::Rectangle | ToolKind::Circle | ToolKind::Line => ToolClass::Shape,
            ToolKind::Unknown(_) => ToolClass::Unrecognized,
        }
    }

    pub fn is_stroke_tool(&self) -> bool {
        self.class() == ToolClass::Stroke
    }

    pub fn is_shape_tool(&self) -> bool {
        self.class() == ToolClass::Shape
    }

    /// Reject tools that cannot be used to construct events locally.
    pub fn ensure_recognized(&self) -> Result<(), EventError> {
        match self {
            ToolKind::Unknown(name) => Err(EventError::InvalidTool(name.clone())),
            _ => Ok(()),
        }
    }
}

impl From<String> for ToolKind {
    fn from(value: String) -> Self {
        match value.as_str() {
            "brush" => ToolKind::Brush,
            "eraser" => ToolKind::Eraser,
            "rectangle" => ToolKind::Rectangle,
            "circle" => ToolKind::Circle,
            "line" => ToolKind::Line,
            _ => ToolKind::Unknown(value),
        }
    }
}

impl From<ToolKind> for String {
    fn from(tool: ToolKind) -> Self {
        match tool {
            ToolKind::Unknown(name) => name,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for ToolKind {
    type Err = EventError;

    /// Strict parse: unknown identifiers fail with `InvalidTool`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tool = ToolKind::from(s.trim().to_string());
        tool.ensure_recognized()?;
        Ok(tool)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Style applied to events produced by the active tool.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ToolStyle {
    /// Paint color. For the eraser only its alpha matters.
    pub color: SerializableColor,
    /// Stroke width in canvas units.
    pub stroke_width: f64,
}

impl ToolStyle {
    pub const DEFAULT_STROKE_WIDTH: f64 = 5.0;

    pub fn new(color: SerializableColor, stroke_width: f64) -> Self {
        Self {
            color,
            stroke_width,
        }
    }
}

impl Default for ToolStyle {
    fn default() -> Self {
        Self {
            color: SerializableColor::black(),
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
        }
    }
}
