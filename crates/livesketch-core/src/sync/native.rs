//! WebSocket event store client for native platforms.

use super::{ClientMessage, ConnectionState, EventRecord, EventStore, ServerMessage, StoreError, StoreEvent};
use crate::drawing::DrawingId;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::{Message, connect};
use url::Url;

/// Commands sent to the WebSocket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// Event store client talking to `livesketch-server` over WebSocket.
///
/// Uses a background thread for non-blocking operation. Commands issued
/// before the handshake completes are queued and sent once connected.
pub struct WsEventStore {
    state: ConnectionState,
    /// Channel to send commands to the WebSocket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Channel to receive events from the WebSocket thread.
    event_rx: Option<Receiver<StoreEvent>>,
    /// Handle to the WebSocket thread.
    thread: Option<JoinHandle<()>>,
}

impl WsEventStore {
    /// Connect to a `ws://` or `wss://` endpoint.
    pub fn connect(url: &str) -> Result<Self, StoreError> {
        let parsed_url = Url::parse(url).map_err(|e| StoreError::InvalidUrl(e.to_string()))?;
        if parsed_url.scheme() != "ws" && parsed_url.scheme() != "wss" {
            return Err(StoreError::InvalidUrl(format!(
                "Invalid WebSocket URL scheme: {}",
                parsed_url.scheme()
            )));
        }

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<StoreEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx));

        Ok(Self {
            state: ConnectionState::Connecting,
            cmd_tx: Some(cmd_tx),
            event_rx: Some(event_rx),
            thread: Some(handle),
        })
    }

    /// Close the connection, waiting for queued messages to be written.
    /// Further requests fail with `NotConnected`.
    pub fn disconnect(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        if let Some(handle) = self.thread.take() {
            if handle.join().is_err() {
                log::warn!("Event store thread panicked");
            }
        }
        self.event_rx = None;
        self.state = ConnectionState::Disconnected;
    }

    /// Get current connection state.
    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Check if connected.
    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    fn send(&self, msg: &ClientMessage) -> Result<(), StoreError> {
        let tx = self.cmd_tx.as_ref().ok_or(StoreError::NotConnected)?;
        let json =
            serde_json::to_string(msg).map_err(|e| StoreError::Serialization(e.to_string()))?;
        tx.send(WsCommand::Send(json))
            .map_err(|_| StoreError::NotConnected)
    }
}

impl EventStore for WsEventStore {
    fn subscribe(&mut self, drawing_id: DrawingId) -> Result<(), StoreError> {
        self.send(&ClientMessage::Subscribe { drawing_id })
    }

    fn unsubscribe(&mut self) -> Result<(), StoreError> {
        self.send(&ClientMessage::Unsubscribe)
    }

    fn insert(&mut self, record: EventRecord) -> Result<(), StoreError> {
        self.send(&ClientMessage::Insert { record })
    }

    fn poll_events(&mut self) -> Vec<StoreEvent> {
        let mut events = Vec::new();
        if let Some(ref rx) = self.event_rx {
            while let Ok(event) = rx.try_recv() {
                match &event {
                    StoreEvent::Connected => self.state = ConnectionState::Connected,
                    StoreEvent::Disconnected => self.state = ConnectionState::Disconnected,
                    StoreEvent::Error { .. } => self.state = ConnectionState::Error,
                    _ => {}
                }
                events.push(event);
            }
        }
        events
    }
}

impl Drop for WsEventStore {
    fn drop(&mut self) {
        let _ = self.unsubscribe();
        self.disconnect();
    }
}

fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<StoreEvent>) {
    log::info!("Event store thread: connecting to {}", url);

    let (mut socket, response) = match connect(url) {
        Ok(pair) => pair,
        Err(e) => {
            log::error!("Event store connection failed: {}", e);
            let _ = event_tx.send(StoreEvent::Error {
                message: format!("Connection failed: {}", e),
            });
            return;
        }
    };
    log::info!("Event store connected, status: {}", response.status());
    let _ = event_tx.send(StoreEvent::Connected);

    // Short read timeout so the loop can interleave outgoing commands.
    if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
        let _ = tcp.set_read_timeout(Some(Duration::from_millis(50)));
        let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
    }

    loop {
        loop {
            match cmd_rx.try_recv() {
                Ok(WsCommand::Send(msg)) => {
                    log::debug!("Event store sending: {}", &msg[..msg.len().min(100)]);
                    if let Err(e) = socket.send(Message::Text(msg)) {
                        log::error!("Event store send error: {}", e);
                        let _ = event_tx.send(StoreEvent::Disconnected);
                        return;
                    }
                }
                Ok(WsCommand::Close) => {
                    log::info!("Event store close requested");
                    let _ = socket.close(None);
                    let _ = socket.flush();
                    return;
                }
                Err(TryRecvError::Disconnected) => {
                    log::info!("Event store command channel disconnected");
                    let _ = socket.close(None);
                    return;
                }
                Err(TryRecvError::Empty) => break,
            }
        }

        match socket.read() {
            Ok(Message::Text(txt)) => match serde_json::from_str::<ServerMessage>(&txt) {
                Ok(server_msg) => {
                    if event_tx.send(StoreEvent::from(server_msg)).is_err() {
                        break;
                    }
                }
                Err(e) => log::warn!("Failed to parse server message: {} ({})", txt, e),
            },
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("Event store received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(e) => {
                log::error!("Event store read error: {}", e);
                break;
            }
        }
    }

    log::info!("Event store thread exiting");
    let _ = event_tx.send(StoreEvent::Disconnected);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_websocket_url() {
        assert!(matches!(
            WsEventStore::connect("http://localhost:3030/ws"),
            Err(StoreError::InvalidUrl(_))
        ));
        assert!(matches!(
            WsEventStore::connect("not a url"),
            Err(StoreError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_requests_fail_after_disconnect() {
        // Nothing listens on port 9; the thread reports an error and exits.
        let mut store = WsEventStore::connect("ws://127.0.0.1:9/ws").unwrap();
        store.disconnect();
        assert_eq!(store.state(), ConnectionState::Disconnected);
        assert_eq!(store.unsubscribe(), Err(StoreError::NotConnected));
    }
}
