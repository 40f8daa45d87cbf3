//! Storage abstraction for page persistence.

mod file;
mod memory;

pub use file::FileStorage;
pub use memory::MemoryStorage;

pub use crate::BoxFuture;

use crate::page::PageRecord;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Page not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for page storage backends.
///
/// Loads hand the engine `{body, drawingData?, highlights?}` plus the
/// pass-through metadata; saves receive the whole record back.
pub trait PageStorage: Send + Sync {
    /// Save a page.
    fn save(&self, id: &str, page: &PageRecord) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a page.
    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<PageRecord>>;

    /// Delete a page.
    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all page IDs.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a page exists.
    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
