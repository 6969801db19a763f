//! File-based blob store for persistent spaces.

use crate::backend::BlobStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Extension of space documents on disk.
const SPACE_EXTENSION: &str = "json";
/// Suffix of the scratch file used for atomic replacement.
const TEMP_SUFFIX: &str = "tmp";

/// A file-based blob store.
///
/// The blob for space `name` in directory `dir` lives at `<dir>/<name>.json`.
///
/// # Durability
///
/// `write()` uses a write-then-rename pattern:
/// 1. Write to `<name>.json.tmp`
/// 2. Sync the temporary file to disk
/// 3. Rename it over `<name>.json`
/// 4. Fsync the directory so the rename is durable
///
/// A crash mid-write therefore leaves either the old or the new document,
/// never a torn one.
///
/// # Thread Safety
///
/// Writes are serialized by an internal lock.
///
/// # Example
///
/// ```no_run
/// use dataspace_storage::{BlobStore, FileBlobStore};
///
/// let store = FileBlobStore::for_space("data", "users");
/// store.ensure_directory().unwrap();
/// store.write(br#"{"tables":{},"config":{}}"#).unwrap();
/// ```
#[derive(Debug)]
pub struct FileBlobStore {
    dir: PathBuf,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBlobStore {
    /// Resolves the blob location for space `name` inside `dir`.
    ///
    /// Nothing is touched on disk until [`BlobStore::ensure_directory`] or
    /// [`BlobStore::write`] is called.
    #[must_use]
    pub fn for_space(dir: impl AsRef<Path>, name: &str) -> Self {
        let dir = dir.as_ref().to_path_buf();
        let path = dir.join(format!("{name}.{SPACE_EXTENSION}"));
        Self {
            dir,
            path,
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the path to the space document.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the directory holding the space document.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".");
        name.push(TEMP_SUFFIX);
        PathBuf::from(name)
    }

    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        let dir = File::open(&self.dir)?;
        dir.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        // NTFS journaling covers rename durability
        Ok(())
    }
}

impl BlobStore for FileBlobStore {
    fn exists(&self) -> StorageResult<bool> {
        Ok(self.path.is_file())
    }

    fn ensure_directory(&self) -> StorageResult<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        if !self.dir.is_dir() {
            return Err(StorageError::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("path is not a directory: {}", self.dir.display()),
            )));
        }
        Ok(())
    }

    fn read(&self) -> StorageResult<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(data) => Ok(data),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Err(StorageError::NotFound {
                path: self.path.clone(),
            }),
            Err(err) => Err(err.into()),
        }
    }

    fn write(&self, data: &[u8]) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        let temp_path = self.temp_path();

        let mut file = File::create(&temp_path)?;
        file.write_all(data)?;
        file.sync_all()?;
        drop(file);

        fs::rename(&temp_path, &self.path)?;
        self.sync_directory()?;

        Ok(())
    }
}
