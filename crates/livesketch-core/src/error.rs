//! Canvas-level errors and the user-facing notices they degrade to.

use crate::event::EventError;
use crate::session::SessionError;
use thiserror::Error;

/// Every failure the live canvas can report. None of them is fatal to the
/// session; at worst one action does not sync.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CanvasError {
    #[error("Unrecognized tool: {0}")]
    InvalidTool(String),
    #[error("Shape is missing its geometry")]
    MissingGeometry,
    #[error("Stroke width must be positive, got {0}")]
    InvalidStrokeWidth(f64),
    #[error("Invalid event: {0}")]
    InvalidEvent(String),
    #[error("No interaction is open")]
    NoActiveInteraction,
    #[error("An interaction is already open")]
    InteractionInProgress,
    #[error("Sign in to draw")]
    NotAuthenticated,
    #[error("Failed to sync: {0}")]
    PersistenceFailure(String),
    #[error("Failed to load drawing: {0}")]
    LoadFailure(String),
    #[error("Live updates unavailable: {0}")]
    SyncUnavailable(String),
}

impl From<EventError> for CanvasError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::InvalidTool(name) => CanvasError::InvalidTool(name),
            EventError::MissingGeometry => CanvasError::MissingGeometry,
            EventError::InvalidStrokeWidth(width) => CanvasError::InvalidStrokeWidth(width),
            other => CanvasError::InvalidEvent(other.to_string()),
        }
    }
}

impl From<SessionError> for CanvasError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::InteractionInProgress => CanvasError::InteractionInProgress,
            SessionError::NoActiveInteraction
            | SessionError::UnexpectedKind { .. }
            | SessionError::AuthorMismatch => CanvasError::NoActiveInteraction,
        }
    }
}

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// A transient, non-fatal message for the participant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl From<&CanvasError> for Notice {
    fn from(err: &CanvasError) -> Self {
        Notice::error(err.to_string())
    }
}

impl From<CanvasError> for Notice {
    fn from(err: CanvasError) -> Self {
        Notice::from(&err)
    }
}
