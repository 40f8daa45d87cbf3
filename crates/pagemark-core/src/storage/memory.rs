//! In-memory page storage.

use super::{BoxFuture, PageStorage, StorageError, StorageResult};
use crate::page::PageRecord;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for testing and ephemeral sessions.
#[derive(Default)]
pub struct MemoryStorage {
    pages: RwLock<HashMap<String, PageRecord>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }
}

fn lock_error(e: impl std::fmt::Display) -> StorageError {
    StorageError::Other(format!("Lock error: {}", e))
}

impl PageStorage for MemoryStorage {
    fn save(&self, id: &str, page: &PageRecord) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        let page = page.clone();
        Box::pin(async move {
            self.pages.write().map_err(lock_error)?.insert(id, page);
            Ok(())
        })
    }

    fn load(&self, id: &str) -> BoxFuture<'_, StorageResult<PageRecord>> {
        let id = id.to_string();
        Box::pin(async move {
            let pages = self.pages.read().map_err(lock_error)?;
            pages.get(&id).cloned().ok_or(StorageError::NotFound(id))
        })
    }

    fn delete(&self, id: &str) -> BoxFuture<'_, StorageResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            self.pages.write().map_err(lock_error)?.remove(&id);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let pages = self.pages.read().map_err(lock_error)?;
            Ok(pages.keys().cloned().collect())
        })
    }

    fn exists(&self, id: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let id = id.to_string();
        Box::pin(async move {
            let pages = self.pages.read().map_err(lock_error)?;
            Ok(pages.contains_key(&id))
        })
    }
}
