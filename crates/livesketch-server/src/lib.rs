//! LiveSketch event store relay.
//!
//! Keeps an append-only log of drawing events per drawing and fans every
//! insert out to all clients subscribed to that drawing, the inserting
//! client included.
//!
//! ## Protocol
//!
//! Messages are JSON tagged by `type`:
//! ```json
//! { "type": "subscribe", "drawing_id": "<uuid>" }
//! { "type": "insert", "record": { "drawing_id": "<uuid>", "author_id": "alice", "event": { ... } } }
//! { "type": "unsubscribe" }
//! ```
//! Replies are `subscribed` (with the stored backlog), `inserted`,
//! `insert_failed` and `error`.

use axum::{
    Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use livesketch_core::sync::{ClientMessage, ServerMessage};
use livesketch_core::{DrawingId, EventId, EventRecord};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// Why an insert was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    #[error("Duplicate event id {0}")]
    Duplicate(EventId),
    #[error("Record author {record} does not match event author {event}")]
    AuthorMismatch { record: String, event: String },
}

/// Stored events and live subscribers of one drawing.
struct DrawingLog {
    tx: broadcast::Sender<EventRecord>,
    records: Vec<EventRecord>,
    ids: HashSet<EventId>,
}

impl DrawingLog {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            records: Vec::new(),
            ids: HashSet::new(),
        }
    }
}

/// Shared application state
#[derive(Default)]
pub struct AppState {
    drawings: DashMap<DrawingId, DrawingLog>,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to a drawing, returning the live receiver and the records
    /// stored so far. Nothing is lost or repeated between the two.
    pub fn subscribe(
        &self,
        drawing_id: DrawingId,
    ) -> (broadcast::Receiver<EventRecord>, Vec<EventRecord>) {
        let log = self
            .drawings
            .entry(drawing_id)
            .or_insert_with(DrawingLog::new);
        (log.tx.subscribe(), log.records.clone())
    }

    /// Append a record and broadcast it to the drawing's subscribers.
    pub fn insert(&self, record: EventRecord) -> Result<(), InsertError> {
        if record.author_id != *record.event.author_id() {
            return Err(InsertError::AuthorMismatch {
                record: record.author_id.to_string(),
                event: record.event.author_id().to_string(),
            });
        }
        let mut log = self
            .drawings
            .entry(record.drawing_id)
            .or_insert_with(DrawingLog::new);
        let event_id = record.event.id();
        if !log.ids.insert(event_id) {
            return Err(InsertError::Duplicate(event_id));
        }
        log.records.push(record.clone());
        // No receivers is fine; the record is stored either way.
        let _ = log.tx.send(record);
        Ok(())
    }

    /// Records stored for a drawing, in insertion order.
    pub fn events(&self, drawing_id: DrawingId) -> Vec<EventRecord> {
        self.drawings
            .get(&drawing_id)
            .map(|log| log.records.clone())
            .unwrap_or_default()
    }

    pub fn drawing_count(&self) -> usize {
        self.drawings.len()
    }
}

/// Build the HTTP router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/ws", get(ws_handler))
        .route("/health", get(health))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Index page
async fn index() -> &'static str {
    "LiveSketch Event Store - Connect via WebSocket at /ws"
}

/// Health check
async fn health() -> &'static str {
    "ok"
}

/// WebSocket upgrade handler
async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

fn encode(msg: &ServerMessage) -> Option<Message> {
    match serde_json::to_string(msg) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            warn!("Failed to encode server message: {}", e);
            None
        }
    }
}

/// Handle a WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let client_id = Uuid::new_v4();
    info!("New connection: {}", client_id);

    let (mut sender, mut receiver) = socket.split();
    let mut subscription: Option<(DrawingId, broadcast::Receiver<EventRecord>)> = None;

    loop {
        let reply = tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(text.as_str()) {
                            Ok(ClientMessage::Subscribe { drawing_id }) => {
                                let (rx, backlog) = state.subscribe(drawing_id);
                                info!("Client {} subscribed to {} ({} stored)", client_id, drawing_id, backlog.len());
                                subscription = Some((drawing_id, rx));
                                Some(ServerMessage::Subscribed { drawing_id, backlog })
                            }
                            Ok(ClientMessage::Unsubscribe) => {
                                if let Some((drawing_id, _)) = subscription.take() {
                                    info!("Client {} unsubscribed from {}", client_id, drawing_id);
                                }
                                None
                            }
                            Ok(ClientMessage::Insert { record }) => {
                                let event_id = record.event.id();
                                match state.insert(record) {
                                    Ok(()) => {
                                        debug!("Client {} inserted {}", client_id, event_id);
                                        None
                                    }
                                    Err(e) => {
                                        warn!("Rejected insert from {}: {}", client_id, e);
                                        Some(ServerMessage::InsertFailed { event_id, message: e.to_string() })
                                    }
                                }
                            }
                            Err(e) => {
                                warn!("Invalid message from {}: {}", client_id, e);
                                Some(ServerMessage::Error { message: format!("Invalid message: {}", e) })
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => None,
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", client_id, e);
                        break;
                    }
                }
            }

            recv = async {
                match &mut subscription {
                    Some((_, rx)) => rx.recv().await,
                    None => std::future::pending().await,
                }
            } => {
                match recv {
                    Ok(record) => Some(ServerMessage::Inserted { record }),
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!("Client {} lagged, {} events skipped", client_id, missed);
                        Some(ServerMessage::Error { message: format!("Missed {} events, reload the drawing", missed) })
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        subscription = None;
                        None
                    }
                }
            }
        };

        if let Some(message) = reply.as_ref().and_then(encode) {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    }

    info!("Connection closed: {}", client_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Point;
    use livesketch_core::{AuthorId, DrawingEvent, ToolKind, ToolStyle};

    fn record(drawing_id: DrawingId, author: &str) -> EventRecord {
        let event = DrawingEvent::stroke_start(
            ToolKind::Brush,
            Point::new(1.0, 1.0),
            &ToolStyle::default(),
            AuthorId::new(author),
            0,
        )
        .unwrap();
        EventRecord::new(drawing_id, event)
    }

    #[tokio::test]
    async fn test_insert_reaches_subscribers() {
        let state = AppState::new();
        let drawing = Uuid::new_v4();
        let (mut rx, backlog) = state.subscribe(drawing);
        assert!(backlog.is_empty());

        let r = record(drawing, "alice");
        state.insert(r.clone()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), r);
        assert_eq!(state.events(drawing), vec![r]);
    }

    #[tokio::test]
    async fn test_subscribe_returns_backlog() {
        let state = AppState::new();
        let drawing = Uuid::new_v4();
        let first = record(drawing, "alice");
        state.insert(first.clone()).unwrap();

        let (mut rx, backlog) = state.subscribe(drawing);
        assert_eq!(backlog, vec![first]);

        let second = record(drawing, "bob");
        state.insert(second.clone()).unwrap();
        assert_eq!(rx.recv().await.unwrap(), second);
    }

    #[test]
    fn test_duplicate_rejected() {
        let state = AppState::new();
        let r = record(Uuid::new_v4(), "alice");
        state.insert(r.clone()).unwrap();
        assert_eq!(state.insert(r.clone()), Err(InsertError::Duplicate(r.event.id())));
        assert_eq!(state.events(r.drawing_id).len(), 1);
    }

    #[test]
    fn test_author_mismatch_rejected() {
        let state = AppState::new();
        let mut r = record(Uuid::new_v4(), "alice");
        r.author_id = AuthorId::new("mallory");
        assert!(matches!(state.insert(r), Err(InsertError::AuthorMismatch { .. })));
    }

    #[test]
    fn test_drawings_are_isolated() {
        let state = AppState::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        state.insert(record(a, "alice")).unwrap();
        let (_rx, backlog) = state.subscribe(b);
        assert!(backlog.is_empty());
        assert_eq!(state.drawing_count(), 2);
    }
}
