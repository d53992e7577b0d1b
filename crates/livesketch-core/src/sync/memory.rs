//! In-process event store.

use super::{EventRecord, EventStore, StoreError, StoreEvent};
use crate::drawing::DrawingId;
use crate::event::EventId;
use std::collections::{HashMap, HashSet};
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex, MutexGuard};

struct Subscriber {
    client: u64,
    drawing_id: DrawingId,
    tx: Sender<StoreEvent>,
}

#[derive(Default)]
struct HubState {
    logs: HashMap<DrawingId, Vec<EventRecord>>,
    ids: HashSet<EventId>,
    subscribers: Vec<Subscriber>,
    next_client: u64,
    fail_inserts: bool,
}

/// Shared in-memory event store for tests and offline sessions.
///
/// Every client created from the same hub sees the same logs, and inserts
/// fan out to all subscribers of the drawing, the inserting client included.
#[derive(Clone, Default)]
pub struct MemoryEventHub {
    state: Arc<Mutex<HubState>>,
}

impl MemoryEventHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a client connected to this hub.
    pub fn client(&self) -> MemoryEventStore {
        let (tx, rx) = channel();
        let client = match self.state.lock() {
            Ok(mut state) => {
                state.next_client += 1;
                state.next_client
            }
            Err(e) => {
                log::error!("Event hub lock poisoned: {}", e);
                0
            }
        };
        let _ = tx.send(StoreEvent::Connected);
        MemoryEventStore {
            state: self.state.clone(),
            client,
            tx,
            rx,
        }
    }

    /// Records stored for a drawing, in insertion order.
    pub fn events(&self, drawing_id: DrawingId) -> Vec<EventRecord> {
        self.state
            .lock()
            .map(|state| state.logs.get(&drawing_id).cloned().unwrap_or_default())
            .unwrap_or_default()
    }

    /// Make every subsequent insert fail until switched off again.
    pub fn set_fail_inserts(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_inserts = fail;
        }
    }
}

/// One participant's connection to a [`MemoryEventHub`].
pub struct MemoryEventStore {
    state: Arc<Mutex<HubState>>,
    client: u64,
    tx: Sender<StoreEvent>,
    rx: Receiver<StoreEvent>,
}

impl MemoryEventStore {
    fn lock(&self) -> Result<MutexGuard<'_, HubState>, StoreError> {
        self.state
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock error: {}", e)))
    }
}

impl EventStore for MemoryEventStore {
    fn subscribe(&mut self, drawing_id: DrawingId) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let client = self.client;
        state.subscribers.retain(|s| s.client != client);
        state.subscribers.push(Subscriber {
            client,
            drawing_id,
            tx: self.tx.clone(),
        });
        let backlog = state.logs.get(&drawing_id).cloned().unwrap_or_default();
        let _ = self.tx.send(StoreEvent::Subscribed {
            drawing_id,
            backlog,
        });
        Ok(())
    }

    fn unsubscribe(&mut self) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let client = self.client;
        state.subscribers.retain(|s| s.client != client);
        Ok(())
    }

    fn insert(&mut self, record: EventRecord) -> Result<(), StoreError> {
        let mut state = self.lock()?;
        let event_id = record.event.id();

        if state.fail_inserts {
            let _ = self.tx.send(StoreEvent::InsertFailed {
                event_id,
                message: "Event store rejected the insert".to_string(),
            });
            return Ok(());
        }
        if !state.ids.insert(event_id) {
            let _ = self.tx.send(StoreEvent::InsertFailed {
                event_id,
                message: format!("Duplicate event id {}", event_id),
            });
            return Ok(());
        }

        state
            .logs
            .entry(record.drawing_id)
            .or_default()
            .push(record.clone());
        state.subscribers.retain(|s| {
            s.drawing_id != record.drawing_id || s.tx.send(StoreEvent::Inserted(record.clone())).is_ok()
        });
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<StoreEvent> {
        self.rx.try_iter().collect()
    }
}

impl Drop for MemoryEventStore {
    fn drop(&mut self) {
        if let Ok(mut state) = self.state.lock() {
            let client = self.client;
            state.subscribers.retain(|s| s.client != client);
        }
    }
}
