//! In-memory blob store for testing.

use crate::backend::BlobStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemoryBlob {
    data: Option<Vec<u8>>,
    writes: usize,
    fail_writes: bool,
}

/// An in-memory blob store.
///
/// This store keeps the document in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral spaces that don't need persistence
///
/// Clones share the same blob, so a test can hand one handle to a space and
/// keep another to observe what was flushed.
///
/// # Example
///
/// ```rust
/// use dataspace_storage::{BlobStore, InMemoryBlobStore};
///
/// let store = InMemoryBlobStore::new();
/// let observer = store.clone();
/// store.write(b"doc").unwrap();
/// assert_eq!(observer.data(), Some(b"doc".to_vec()));
/// assert_eq!(observer.write_count(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct InMemoryBlobStore {
    blob: Arc<RwLock<MemoryBlob>>,
}

impl InMemoryBlobStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding a pre-existing document.
    ///
    /// Useful for testing load paths.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            blob: Arc::new(RwLock::new(MemoryBlob {
                data: Some(data),
                ..MemoryBlob::default()
            })),
        }
    }

    /// Returns a copy of the current blob, if any.
    #[must_use]
    pub fn data(&self) -> Option<Vec<u8>> {
        self.blob.read().data.clone()
    }

    /// Returns how many writes have succeeded.
    #[must_use]
    pub fn write_count(&self) -> usize {
        self.blob.read().writes
    }

    /// Makes subsequent writes fail with an I/O error.
    ///
    /// Used to exercise flush failure handling.
    pub fn set_fail_writes(&self, fail: bool) {
        self.blob.write().fail_writes = fail;
    }
}

impl BlobStore for InMemoryBlobStore {
    fn exists(&self) -> StorageResult<bool> {
        Ok(self.blob.read().data.is_some())
    }

    fn ensure_directory(&self) -> StorageResult<()> {
        // No container to create
        Ok(())
    }

    fn read(&self) -> StorageResult<Vec<u8>> {
        self.blob
            .read()
            .data
            .clone()
            .ok_or_else(|| StorageError::NotFound {
                path: PathBuf::from(":memory:"),
            })
    }

    fn write(&self, data: &[u8]) -> StorageResult<()> {
        let mut blob = self.blob.write();
        if blob.fail_writes {
            return Err(StorageError::Io(io::Error::other("injected write failure")));
        }
        blob.data = Some(data.to_vec());
        blob.writes += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_new_is_empty() {
        let store = InMemoryBlobStore::new();
        assert!(!store.exists().unwrap());
        assert!(store.data().is_none());
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn memory_read_missing_fails() {
        let store = InMemoryBlobStore::new();
        assert!(matches!(store.read(), Err(StorageError::NotFound { .. })));
    }

    #[test]
    fn memory_write_replaces() {
        let store = InMemoryBlobStore::new();
        store.write(b"first").unwrap();
        store.write(b"second").unwrap();

        assert_eq!(store.read().unwrap(), b"second");
        assert_eq!(store.write_count(), 2);
    }

    #[test]
    fn memory_with_data() {
        let store = InMemoryBlobStore::with_data(b"preloaded".to_vec());
        assert!(store.exists().unwrap());
        assert_eq!(store.read().unwrap(), b"preloaded");
        assert_eq!(store.write_count(), 0);
    }

    #[test]
    fn memory_clones_share_blob() {
        let store = InMemoryBlobStore::new();
        let observer = store.clone();

        store.write(b"shared").unwrap();
        assert_eq!(observer.data(), Some(b"shared".to_vec()));
    }

    #[test]
    fn memory_injected_failure_keeps_previous_blob() {
        let store = InMemoryBlobStore::new();
        store.write(b"good").unwrap();

        store.set_fail_writes(true);
        assert!(matches!(store.write(b"bad"), Err(StorageError::Io(_))));
        assert_eq!(store.read().unwrap(), b"good");
        assert_eq!(store.write_count(), 1);

        store.set_fail_writes(false);
        store.write(b"better").unwrap();
        assert_eq!(store.read().unwrap(), b"better");
    }

    #[test]
    fn memory_ensure_directory_is_noop() {
        let store = InMemoryBlobStore::new();
        assert!(store.ensure_directory().is_ok());
        assert!(!store.exists().unwrap());
    }
}
