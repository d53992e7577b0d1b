//! Document store: persisted drawings and their saved snapshots.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

use crate::drawing::{Drawing, DrawingId, DrawingUpdate};
use crate::event::AuthorId;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Drawing not found: {0}")]
    NotFound(DrawingId),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for drawing document backends.
pub trait DocumentStore: Send + Sync {
    /// Load a drawing.
    fn get_drawing(&self, id: DrawingId) -> BoxFuture<'_, StorageResult<Drawing>>;

    /// Create and store a new empty, public drawing.
    fn create_drawing(&self, title: &str, owner_id: &AuthorId)
    -> BoxFuture<'_, StorageResult<Drawing>>;

    /// Replace a drawing's saved snapshot.
    fn update_drawing(&self, id: DrawingId, update: DrawingUpdate)
    -> BoxFuture<'_, StorageResult<()>>;

    /// All stored drawings.
    fn list_drawings(&self) -> BoxFuture<'_, StorageResult<Vec<Drawing>>>;
}

#[cfg(test)]
pub(crate) fn block_on<F: std::future::Future>(f: F) -> F::Output {
    use std::task::{Context, Poll, RawWaker, RawWakerVTable, Waker};

    fn dummy_raw_waker() -> RawWaker {
        fn no_op(_: *const ()) {}
        fn clone(_: *const ()) -> RawWaker {
            dummy_raw_waker()
        }
        static VTABLE: RawWakerVTable = RawWakerVTable::new(clone, no_op, no_op, no_op);
        RawWaker::new(std::ptr::null(), &VTABLE)
    }

    let waker = unsafe { Waker::from_raw(dummy_raw_waker()) };
    let mut cx = Context::from_waker(&waker);
    let mut f = std::pin::pin!(f);

    loop {
        match f.as_mut().poll(&mut cx) {
            Poll::Ready(result) => return result,
            Poll::Pending => {}
        }
    }
}
