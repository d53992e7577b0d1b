use livesketch_core::{CanvasError, ConfigError, StorageError, StoreError};
use livesketch_render::{ExportError, RendererError};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Canvas(#[from] CanvasError),
    #[error("Storage unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("Event store unavailable: {0}")]
    EventStore(#[from] StoreError),
    #[error(transparent)]
    Render(#[from] RendererError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("Failed to write {path}: {message}")]
    Write { path: PathBuf, message: String },
}

pub type AppResult<T> = Result<T, AppError>;
