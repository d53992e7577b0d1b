//! Sync gateway: bridges the session log to the external event store.

use crate::drawing::DrawingId;
use crate::error::CanvasError;
use crate::event::{AuthorId, DrawingEvent};
use crate::sync::{EventRecord, EventStore, StoreEvent};

/// True when `record` was produced by the local participant.
///
/// The local copy of such an event was already rendered and logged when it
/// was produced, so the echo must be dropped. With no local identity nothing
/// counts as an echo.
pub fn is_self_echo(local: Option<&AuthorId>, record: &EventRecord) -> bool {
    local.is_some_and(|local| record.author_id == *local)
}

/// What one poll of the store yielded.
#[derive(Debug, Default)]
pub struct Inbound {
    /// Remote events to ingest and paint, in delivery order.
    pub remote: Vec<DrawingEvent>,
    /// Failures reported by the store since the last poll.
    pub failures: Vec<CanvasError>,
}

/// Persists local events and filters remote ones for a single drawing.
pub struct SyncGateway<E: EventStore> {
    store: E,
    drawing_id: DrawingId,
    local: Option<AuthorId>,
    subscribed: bool,
}

impl<E: EventStore> SyncGateway<E> {
    pub fn new(store: E, drawing_id: DrawingId, local: Option<AuthorId>) -> Self {
        Self {
            store,
            drawing_id,
            local,
            subscribed: false,
        }
    }

    pub fn drawing_id(&self) -> DrawingId {
        self.drawing_id
    }

    pub fn local_author(&self) -> Option<&AuthorId> {
        self.local.as_ref()
    }

    pub fn is_subscribed(&self) -> bool {
        self.subscribed
    }

    pub fn store(&self) -> &E {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut E {
        &mut self.store
    }

    /// Open the live subscription for this drawing.
    pub fn connect(&mut self) -> Result<(), CanvasError> {
        self.store
            .subscribe(self.drawing_id)
            .map_err(|e| CanvasError::SyncUnavailable(e.to_string()))?;
        self.subscribed = true;
        log::info!("Subscribed to drawing {}", self.drawing_id);
        Ok(())
    }

    /// Hand a committed batch to the store, in order.
    ///
    /// Failures are returned for display; nothing is rolled back or retried.
    pub fn persist(&mut self, batch: &[DrawingEvent]) -> Vec<CanvasError> {
        let mut failures = Vec::new();
        for event in batch {
            let record = EventRecord::new(self.drawing_id, event.clone());
            if let Err(e) = self.store.insert(record) {
                log::error!("Failed to persist event {}: {}", event.id(), e);
                failures.push(CanvasError::PersistenceFailure(e.to_string()));
            }
        }
        failures
    }

    /// Drain the store and keep what the session should ingest.
    pub fn poll(&mut self) -> Inbound {
        let mut inbound = Inbound::default();
        for store_event in self.store.poll_events() {
            match store_event {
                StoreEvent::Inserted(record) => self.accept(record, &mut inbound),
                StoreEvent::Subscribed {
                    drawing_id,
                    backlog,
                } => {
                    // The saved snapshot is the durable state; only inserts
                    // made after the subscription went live are ingested.
                    log::debug!(
                        "Subscription to {} live, skipping {} stored events",
                        drawing_id,
                        backlog.len()
                    );
                }
                StoreEvent::InsertFailed { event_id, message } => {
                    log::error!("Event store rejected {}: {}", event_id, message);
                    inbound
                        .failures
                        .push(CanvasError::PersistenceFailure(message));
                }
                StoreEvent::Connected => log::info!("Event store connected"),
                StoreEvent::Disconnected => {
                    log::warn!("Event store disconnected");
                    self.subscribed = false;
                    inbound
                        .failures
                        .push(CanvasError::SyncUnavailable("disconnected".to_string()));
                }
                StoreEvent::Error { message } => {
                    log::error!("Event store error: {}", message);
                    inbound.failures.push(CanvasError::SyncUnavailable(message));
                }
            }
        }
        inbound
    }

    /// Tear down the subscription.
    pub fn disconnect(&mut self) {
        if !self.subscribed {
            return;
        }
        if let Err(e) = self.store.unsubscribe() {
            log::warn!("Failed to unsubscribe from {}: {}", self.drawing_id, e);
        }
        self.subscribed = false;
    }

    fn accept(&self, record: EventRecord, inbound: &mut Inbound) {
        if record.drawing_id != self.drawing_id {
            log::debug!("Dropping event for other drawing {}", record.drawing_id);
        } else if is_self_echo(self.local.as_ref(), &record) {
            log::trace!("Dropping self-echo {}", record.event.id());
        } else {
            inbound.remote.push(record.event);
        }
    }
}

impl<E: EventStore> Drop for SyncGateway<E> {
    fn drop(&mut self) {
        self.disconnect();
    }
}
