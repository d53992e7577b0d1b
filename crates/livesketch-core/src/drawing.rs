//! Persisted drawing documents.

use crate::event::{AuthorId, DrawingEvent, unix_millis};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique drawing identifier.
pub type DrawingId = Uuid;

/// Who can open a drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    #[default]
    Public,
    Private,
}

/// A drawing as held by the document store.
///
/// `canvas_data` is the full event log at the time of the last save. It is
/// only a point-in-time snapshot; live events travel through the event store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Drawing {
    pub id: DrawingId,
    pub title: String,
    pub owner_id: AuthorId,
    #[serde(default)]
    pub canvas_data: Vec<DrawingEvent>,
    #[serde(default)]
    pub visibility: Visibility,
    /// Last save, in Unix milliseconds.
    pub updated_at: u64,
}

impl Drawing {
    pub const DEFAULT_TITLE: &'static str = "Untitled Drawing";

    /// A new, empty, public drawing.
    pub fn new(title: impl Into<String>, owner_id: AuthorId) -> Self {
        let title = title.into();
        let title = if title.trim().is_empty() {
            Self::DEFAULT_TITLE.to_string()
        } else {
            title
        };
        Self {
            id: Uuid::new_v4(),
            title,
            owner_id,
            canvas_data: Vec::new(),
            visibility: Visibility::Public,
            updated_at: unix_millis(),
        }
    }

    pub fn apply_update(&mut self, update: DrawingUpdate) {
        self.canvas_data = update.canvas_data;
        self.updated_at = update.updated_at;
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Replacement of a drawing's stored snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawingUpdate {
    pub canvas_data: Vec<DrawingEvent>,
    pub updated_at: u64,
}

impl DrawingUpdate {
    pub fn new(canvas_data: Vec<DrawingEvent>) -> Self {
        Self {
            canvas_data,
            updated_at: unix_millis(),
        }
    }
}
