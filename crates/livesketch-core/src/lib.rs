//! LiveSketch Core Library
//!
//! Platform-agnostic drawing model for the LiveSketch shared canvas: the
//! drawing-event vocabulary, the in-memory session log, the interaction state
//! machine and the bridge to the external event and document stores.

pub mod canvas;
pub mod config;
pub mod drawing;
pub mod error;
pub mod event;
pub mod gateway;
pub mod identity;
pub mod interaction;
pub mod routing;
pub mod session;
pub mod storage;
pub mod sync;
pub mod tools;

pub use canvas::{Canvas, CanvasUpdate, Repaint};
pub use config::{CanvasConfig, ConfigError};
pub use drawing::{Drawing, DrawingId, DrawingUpdate, Visibility};
pub use error::{CanvasError, Notice, NoticeLevel};
pub use event::{
    AuthorId, DrawingEvent, EventError, EventId, EventKind, Primitive, SerializableColor,
    SessionClock, ShapeExtent,
};
pub use gateway::{Inbound, SyncGateway, is_self_echo};
pub use identity::{IdentityProvider, StaticIdentity};
pub use interaction::{Gesture, InteractionController, InteractionState};
pub use routing::{CanvasRoute, OpenedDrawing, RouteError, open_drawing};
pub use session::{SessionError, SessionLog};
pub use storage::{DocumentStore, FileStorage, MemoryStorage, StorageError, StorageResult};
pub use sync::{
    ConnectionState, EventRecord, EventStore, MemoryEventHub, MemoryEventStore, StoreError,
    StoreEvent, WsEventStore,
};
pub use tools::{ToolClass, ToolKind, ToolStyle};
