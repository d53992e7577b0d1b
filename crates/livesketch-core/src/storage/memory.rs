//! In-memory storage implementation.

use super::{BoxFuture, DocumentStore, StorageError, StorageResult};
use crate::drawing::{Drawing, DrawingId, DrawingUpdate};
use crate::event::AuthorId;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral use.
#[derive(Default)]
pub struct MemoryStorage {
    drawings: RwLock<HashMap<DrawingId, Drawing>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a drawing as-is, replacing any with the same id.
    pub fn insert(&self, drawing: Drawing) -> StorageResult<()> {
        let mut drawings = self
            .drawings
            .write()
            .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
        drawings.insert(drawing.id, drawing);
        Ok(())
    }
}

impl DocumentStore for MemoryStorage {
    fn get_drawing(&self, id: DrawingId) -> BoxFuture<'_, StorageResult<Drawing>> {
        Box::pin(async move {
            let drawings = self
                .drawings
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            drawings.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn create_drawing(
        &self,
        title: &str,
        owner_id: &AuthorId,
    ) -> BoxFuture<'_, StorageResult<Drawing>> {
        let drawing = Drawing::new(title, owner_id.clone());
        Box::pin(async move {
            self.insert(drawing.clone())?;
            Ok(drawing)
        })
    }

    fn update_drawing(
        &self,
        id: DrawingId,
        update: DrawingUpdate,
    ) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut drawings = self
                .drawings
                .write()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            let drawing = drawings.get_mut(&id).ok_or(StorageError::NotFound(id))?;
            drawing.apply_update(update);
            Ok(())
        })
    }

    fn list_drawings(&self) -> BoxFuture<'_, StorageResult<Vec<Drawing>>> {
        Box::pin(async move {
            let drawings = self
                .drawings
                .read()
                .map_err(|e| StorageError::Other(format!("Lock error: {}", e)))?;
            Ok(drawings.values().cloned().collect())
        })
    }
}
