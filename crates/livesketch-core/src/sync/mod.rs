//! Event store client interface and wire protocol.
//!
//! The event store is append-only and scoped per drawing. Clients insert
//! records and receive every insert for the drawing they subscribed to,
//! their own included; telling self-echoes apart is the gateway's job.

mod memory;
mod native;

pub use memory::{MemoryEventHub, MemoryEventStore};
pub use native::WsEventStore;

use crate::drawing::DrawingId;
use crate::event::{AuthorId, DrawingEvent, EventId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A drawing event as stored: tagged with its drawing and author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub drawing_id: DrawingId,
    pub author_id: AuthorId,
    pub event: DrawingEvent,
}

impl EventRecord {
    /// Tag an event for `drawing_id`, using the event's own author.
    pub fn new(drawing_id: DrawingId, event: DrawingEvent) -> Self {
        Self {
            drawing_id,
            author_id: event.author_id().clone(),
            event,
        }
    }
}

/// Messages sent to the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Start receiving inserts for a drawing. Replaces any previous subscription.
    Subscribe { drawing_id: DrawingId },
    /// Stop receiving inserts.
    Unsubscribe,
    /// Append a record to the store.
    Insert { record: EventRecord },
}

/// Messages received from the server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Subscription confirmed, with records stored so far for the drawing.
    Subscribed {
        drawing_id: DrawingId,
        #[serde(default)]
        backlog: Vec<EventRecord>,
    },
    /// A record was committed by some participant.
    Inserted { record: EventRecord },
    /// An insert by this client was rejected.
    InsertFailed { event_id: EventId, message: String },
    /// Error message
    Error { message: String },
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Notifications from an event store client.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreEvent {
    Connected,
    Disconnected,
    /// Subscription is live. `backlog` holds records inserted before it.
    Subscribed {
        drawing_id: DrawingId,
        backlog: Vec<EventRecord>,
    },
    Inserted(EventRecord),
    /// A previous `insert` did not make it into the store.
    InsertFailed { event_id: EventId, message: String },
    Error { message: String },
}

impl From<ServerMessage> for StoreEvent {
    fn from(msg: ServerMessage) -> Self {
        match msg {
            ServerMessage::Subscribed {
                drawing_id,
                backlog,
            } => StoreEvent::Subscribed {
                drawing_id,
                backlog,
            },
            ServerMessage::Inserted { record } => StoreEvent::Inserted(record),
            ServerMessage::InsertFailed { event_id, message } => {
                StoreEvent::InsertFailed { event_id, message }
            }
            ServerMessage::Error { message } => StoreEvent::Error { message },
        }
    }
}

/// Event store errors raised synchronously by a client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Not connected")]
    NotConnected,
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Event store unavailable: {0}")]
    Unavailable(String),
}

/// Non-blocking client of an append-only event store.
///
/// Calls never wait for the store: outcomes arrive later through
/// [`EventStore::poll_events`]. A synchronous `Err` means the request could
/// not even be handed off.
pub trait EventStore: Send {
    fn subscribe(&mut self, drawing_id: DrawingId) -> Result<(), StoreError>;

    fn unsubscribe(&mut self) -> Result<(), StoreError>;

    fn insert(&mut self, record: EventRecord) -> Result<(), StoreError>;

    /// Drain pending notifications.
    fn poll_events(&mut self) -> Vec<StoreEvent>;
}

impl<T: EventStore + ?Sized> EventStore for Box<T> {
    fn subscribe(&mut self, drawing_id: DrawingId) -> Result<(), StoreError> {
        (**self).subscribe(drawing_id)
    }

    fn unsubscribe(&mut self) -> Result<(), StoreError> {
        (**self).unsubscribe()
    }

    fn insert(&mut self, record: EventRecord) -> Result<(), StoreError> {
        (**self).insert(record)
    }

    fn poll_events(&mut self) -> Vec<StoreEvent> {
        (**self).poll_events()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolKind, ToolStyle};
    use kurbo::Point;
    use uuid::Uuid;

    #[test]
    fn test_client_message_tagging() {
        let drawing_id = Uuid::new_v4();
        let json = serde_json::to_value(ClientMessage::Subscribe { drawing_id }).unwrap();
        assert_eq!(json["type"], "subscribe");
        assert_eq!(json["drawing_id"], drawing_id.to_string());

        let json = serde_json::to_value(ClientMessage::Unsubscribe).unwrap();
        assert_eq!(json["type"], "unsubscribe");
    }

    #[test]
    fn test_server_message_into_store_event() {
        let event = DrawingEvent::stroke_start(
            ToolKind::Brush,
            Point::new(1.0, 1.0),
            &ToolStyle::default(),
            AuthorId::new("bob"),
            0,
        )
        .unwrap();
        let record = EventRecord::new(Uuid::new_v4(), event);
        assert_eq!(record.author_id, AuthorId::new("bob"));

        let json = serde_json::to_string(&ServerMessage::Inserted {
            record: record.clone(),
        })
        .unwrap();
        let msg: ServerMessage = serde_json::from_str(&json).unwrap();
        assert_eq!(StoreEvent::from(msg), StoreEvent::Inserted(record));
    }

    #[test]
    fn test_subscribed_backlog_defaults_empty() {
        let json = r#"{"type":"subscribed","drawing_id":"1b4e28ba-2fa1-11d2-883f-0016d3cca427"}"#;
        let msg: ServerMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            StoreEvent::from(msg),
            StoreEvent::Subscribed { backlog, .. } if backlog.is_empty()
        ));
    }
}
