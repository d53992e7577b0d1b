//! In-memory session log: committed events plus the interaction in progress.

use crate::event::{DrawingEvent, EventId, EventKind};
use std::collections::HashSet;
use thiserror::Error;

/// Illegal session-log transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    #[error("No interaction is open")]
    NoActiveInteraction,
    #[error("An interaction is already open")]
    InteractionInProgress,
    #[error("Expected a {expected:?} event, got {found:?}")]
    UnexpectedKind { expected: EventKind, found: EventKind },
    #[error("Segment author does not own the open interaction")]
    AuthorMismatch,
}

/// Ordered, append-only log `L` of committed events plus the pending path.
///
/// Stroke events are held in the pending path until the interaction ends and
/// then folded into the log in one batch. Shapes and remote events go
/// straight to the log.
#[derive(Debug, Clone, Default)]
pub struct SessionLog {
    committed: Vec<DrawingEvent>,
    pending: Vec<DrawingEvent>,
    ids: HashSet<EventId>,
}

impl SessionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a stroke interaction.
    pub fn begin_interaction(&mut self, event: DrawingEvent) -> Result<(), SessionError> {
        if !self.pending.is_empty() {
            return Err(SessionError::InteractionInProgress);
        }
        expect_kind(&event, EventKind::StrokeStart)?;
        self.pending.push(event);
        Ok(())
    }

    /// Add a segment to the open stroke.
    pub fn extend_interaction(&mut self, event: DrawingEvent) -> Result<(), SessionError> {
        let Some(start) = self.pending.first() else {
            return Err(SessionError::NoActiveInteraction);
        };
        expect_kind(&event, EventKind::StrokeSegment)?;
        if start.author_id() != event.author_id() {
            return Err(SessionError::AuthorMismatch);
        }
        self.pending.push(event);
        Ok(())
    }

    /// Append a single-shot shape directly to the log.
    pub fn commit_shape(&mut self, event: DrawingEvent) -> Result<(), SessionError> {
        expect_kind(&event, EventKind::ShapeCommit)?;
        self.append(event);
        Ok(())
    }

    /// Fold the pending path into the log and hand the batch back for persistence.
    pub fn end_interaction(&mut self) -> Result<Vec<DrawingEvent>, SessionError> {
        if self.pending.is_empty() {
            return Err(SessionError::NoActiveInteraction);
        }
        let batch = std::mem::take(&mut self.pending);
        for event in &batch {
            self.append(event.clone());
        }
        Ok(batch)
    }

    /// Append an event produced by another participant.
    ///
    /// Returns `false` when the event id is already in the log.
    pub fn ingest_remote(&mut self, event: DrawingEvent) -> bool {
        if self.ids.contains(&event.id()) {
            log::debug!("Ignoring duplicate delivery of event {}", event.id());
            return false;
        }
        self.append(event);
        true
    }

    /// The committed log, in order.
    pub fn snapshot(&self) -> &[DrawingEvent] {
        &self.committed
    }

    /// Events of the open interaction, in order.
    pub fn pending(&self) -> &[DrawingEvent] {
        &self.pending
    }

    pub fn has_open_interaction(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Committed events followed by the open interaction; what a full
    /// repaint must draw to match the live surface.
    pub fn replay_sequence(&self) -> Vec<DrawingEvent> {
        self.committed.iter().chain(&self.pending).cloned().collect()
    }

    pub fn contains(&self, id: EventId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.committed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.committed.is_empty()
    }

    /// Clear the log and the pending path.
    pub fn reset(&mut self) {
        self.committed.clear();
        self.pending.clear();
        self.ids.clear();
    }

    /// Replace the log with a snapshot loaded from storage.
    ///
    /// Whatever the log held before is dropped: the stored drawing is the
    /// durable state. The open interaction, if any, is kept.
    pub fn hydrate(&mut self, events: Vec<DrawingEvent>) -> &[DrawingEvent] {
        let dropped = self.committed.len();
        self.committed.clear();
        self.ids.clear();
        for event in events {
            if !self.ids.contains(&event.id()) {
                self.append(event);
            }
        }
        if dropped > 0 {
            log::debug!("Hydrate replaced {} previously logged events", dropped);
        }
        for event in &self.pending {
            self.ids.insert(event.id());
        }
        &self.committed
    }

    fn append(&mut self, event: DrawingEvent) {
        self.ids.insert(event.id());
        self.committed.push(event);
    }
}

fn expect_kind(event: &DrawingEvent, expected: EventKind) -> Result<(), SessionError> {
    if event.kind() == expected {
        Ok(())
    } else {
        Err(SessionError::UnexpectedKind {
            expected,
            found: event.kind(),
        })
    }
}
