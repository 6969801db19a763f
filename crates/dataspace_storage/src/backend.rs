//! Blob store trait definition.

use crate::error::StorageResult;

/// A durable store holding one encoded space document.
///
/// Blob stores are **opaque**. They read and replace the whole document and
/// never look inside it. DataSpace owns the document format.
///
/// # Invariants
///
/// - `read` returns exactly the bytes of the last successful `write`
/// - `write` replaces the previous blob entirely; a failed write leaves the
///   previous blob readable
/// - `exists` is `false` until the first successful `write`
/// - Stores must be `Send + Sync` so a background flush can use them
///
/// # Implementors
///
/// - [`super::InMemoryBlobStore`] - For testing
/// - [`super::FileBlobStore`] - For persistent storage
pub trait BlobStore: Send + Sync {
    /// Returns whether a blob has been written.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying medium cannot be queried.
    fn exists(&self) -> StorageResult<bool>;

    /// Creates whatever container the blob lives in (a directory for files).
    ///
    /// Calling this when the container already exists is a no-op.
    ///
    /// # Errors
    ///
    /// Returns an error if the container cannot be created.
    fn ensure_directory(&self) -> StorageResult<()>;

    /// Reads the whole blob.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::NotFound`] if nothing was written yet,
    /// or an I/O error.
    fn read(&self) -> StorageResult<Vec<u8>>;

    /// Replaces the whole blob with `data`.
    ///
    /// After this returns successfully the data survives process
    /// termination (for durable implementations).
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn write(&self, data: &[u8]) -> StorageResult<()>;
}
