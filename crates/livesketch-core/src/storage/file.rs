//! File-based storage implementation for native platforms.

use super::{BoxFuture, DocumentStore, StorageError, StorageResult};
use crate::drawing::{Drawing, DrawingId, DrawingUpdate};
use crate::event::AuthorId;
use std::fs;
use std::path::{Path, PathBuf};

/// File-based storage for native platforms.
///
/// Stores drawings as JSON files in a specified directory, one per drawing.
pub struct FileStorage {
    /// Base directory for drawing storage.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Linux: `~/.local/share/livesketch/drawings/`
    /// On Windows: `%LOCALAPPDATA%\livesketch\drawings\`
    pub fn default_location() -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Self::new(base.join("livesketch").join("drawings"))
    }

    fn drawing_path(&self, id: DrawingId) -> PathBuf {
        self.base_path.join(format!("{}.json", id.as_hyphenated()))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn write(&self, drawing: &Drawing) -> StorageResult<()> {
        let path = self.drawing_path(drawing.id);
        let json = drawing
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(&path, json)
            .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", path.display(), e)))
    }

    fn read(&self, id: DrawingId) -> StorageResult<Drawing> {
        let path = self.drawing_path(id);
        if !path.exists() {
            return Err(StorageError::NotFound(id));
        }
        read_file(&path)
    }
}

fn read_file(path: &Path) -> StorageResult<Drawing> {
    let json = fs::read_to_string(path)
        .map_err(|e| StorageError::Io(format!("Failed to read {}: {}", path.display(), e)))?;
    Drawing::from_json(&json).map_err(|e| {
        StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
    })
}

impl DocumentStore for FileStorage {
    fn get_drawing(&self, id: DrawingId) -> BoxFuture<'_, StorageResult<Drawing>> {
        Box::pin(async move { self.read(id) })
    }

    fn create_drawing(
        &self,
        title: &str,
        owner_id: &AuthorId,
    ) -> BoxFuture<'_, StorageResult<Drawing>> {
        let drawing = Drawing::new(title, owner_id.clone());
        Box::pin(async move {
            self.write(&drawing)?;
            log::info!("Created drawing {} at {}", drawing.id, self.base_path.display());
            Ok(drawing)
        })
    }

    fn update_drawing(
        &self,
        id: DrawingId,
        update: DrawingUpdate,
    ) -> BoxFuture<'_, StorageResult<()>> {
        Box::pin(async move {
            let mut drawing = self.read(id)?;
            drawing.apply_update(update);
            self.write(&drawing)
        })
    }

    fn list_drawings(&self) -> BoxFuture<'_, StorageResult<Vec<Drawing>>> {
        Box::pin(async move {
            let entries = fs::read_dir(&self.base_path)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;

            let mut drawings = Vec::new();
            for entry in entries.flatten() {
                let path = entry.path();
                // Only include .json files
                if path.extension().map(|e| e == "json").unwrap_or(false) {
                    match read_file(&path) {
                        Ok(drawing) => drawings.push(drawing),
                        Err(e) => log::warn!("Skipping unreadable drawing: {}", e),
                    }
                }
            }
            Ok(drawings)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::block_on;
    use tempfile::tempdir;
    use uuid::Uuid;

    #[test]
    fn test_file_storage_create_and_get() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let created = block_on(storage.create_drawing("Test Drawing", &AuthorId::new("alice")))
            .unwrap();
        let loaded = block_on(storage.get_drawing(created.id)).unwrap();

        assert_eq!(loaded.title, "Test Drawing");
        assert!(dir.path().join(format!("{}.json", created.id)).exists());
    }

    #[test]
    fn test_file_storage_not_found() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();

        let result = block_on(storage.get_drawing(Uuid::new_v4()));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_file_storage_update_persists_empty_snapshot() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let drawing = block_on(storage.create_drawing("", &AuthorId::new("alice"))).unwrap();

        block_on(storage.update_drawing(drawing.id, DrawingUpdate::new(Vec::new()))).unwrap();

        let reloaded = FileStorage::new(dir.path().to_path_buf()).unwrap();
        let loaded = block_on(reloaded.get_drawing(drawing.id)).unwrap();
        assert!(loaded.canvas_data.is_empty());
        assert_eq!(loaded.title, Drawing::DEFAULT_TITLE);
    }

    #[test]
    fn test_file_storage_list_skips_foreign_files() {
        let dir = tempdir().unwrap();
        let storage = FileStorage::new(dir.path().to_path_buf()).unwrap();
        block_on(storage.create_drawing("one", &AuthorId::new("alice"))).unwrap();
        block_on(storage.create_drawing("two", &AuthorId::new("alice"))).unwrap();
        fs::write(dir.path().join("notes.txt"), "hello").unwrap();
        fs::write(dir.path().join("broken.json"), "{").unwrap();

        let list = block_on(storage.list_drawings()).unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn test_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let storage = FileStorage::new(nested.clone()).unwrap();
        assert_eq!(storage.base_path(), nested.as_path());
        assert!(nested.exists());
    }
}
