//! Test fixtures and space helpers.
//!
//! Provides convenience functions for setting up test spaces and
//! reopening them from disk.

use dataspace_core::{Config, DataSpace, DataSpaceResult};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tracing_subscriber::EnvFilter;

/// Name of the space document created by file-based fixtures.
pub const TEST_SPACE_NAME: &str = "test";

/// Installs a test-friendly tracing subscriber.
///
/// Honors `RUST_LOG` and defaults to `warn`. Safe to call from every test;
/// only the first call installs anything.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// A test space with automatic cleanup.
pub struct TestSpace {
    /// The space instance.
    pub space: DataSpace,
    config: Config,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: Option<TempDir>,
}

impl TestSpace {
    /// Creates a new in-memory test space.
    pub fn memory() -> Self {
        Self {
            space: DataSpace::open_in_memory().expect("Failed to open in-memory space"),
            config: Config::default(),
            temp_dir: None,
        }
    }

    /// Creates a new file-based test space that flushes on every mutation.
    pub fn file() -> Self {
        Self::file_with_config(Config::default())
    }

    /// Creates a new file-based test space with custom configuration.
    pub fn file_with_config(config: Config) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let space = DataSpace::open_with_config(temp_dir.path(), TEST_SPACE_NAME, config)
            .expect("Failed to open file space");

        Self {
            space,
            config,
            temp_dir: Some(temp_dir),
        }
    }

    /// Returns the space directory if file-based, None if in-memory.
    pub fn dir(&self) -> Option<&Path> {
        self.temp_dir.as_ref().map(TempDir::path)
    }

    /// Returns the document path if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self.space.path().map(Path::to_path_buf)
    }

    /// Closes the space and opens it again from disk.
    ///
    /// # Panics
    ///
    /// Panics for in-memory spaces, which have nothing to reopen.
    pub fn reopen(self) -> DataSpaceResult<Self> {
        let Self {
            space,
            config,
            temp_dir,
        } = self;
        let temp_dir = temp_dir.expect("Only file-based spaces can be reopened");

        space.close()?;
        drop(space);

        let space = DataSpace::open_with_config(temp_dir.path(), TEST_SPACE_NAME, config)?;
        Ok(Self {
            space,
            config,
            temp_dir: Some(temp_dir),
        })
    }
}

impl std::ops::Deref for TestSpace {
    type Target = DataSpace;

    fn deref(&self) -> &Self::Target {
        &self.space
    }
}

/// Runs a test with a temporary in-memory space.
///
/// # Example
///
/// ```rust
/// use dataspace_testkit::with_temp_space;
///
/// with_temp_space(|space| {
///     space.create_table("test", None).unwrap();
///     assert!(space.has_table("test"));
/// });
/// ```
pub fn with_temp_space<F, R>(f: F) -> R
where
    F: FnOnce(&DataSpace) -> R,
{
    let test_space = TestSpace::memory();
    f(&test_space.space)
}

/// Runs a test with a temporary file-based space.
pub fn with_file_space<F, R>(f: F) -> R
where
    F: FnOnce(&DataSpace, &Path) -> R,
{
    let test_space = TestSpace::file();
    let path = test_space.path().expect("File space should have a path");
    f(&test_space.space, &path)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;
    use dataspace_core::{Record, TableConfig};
    use serde_json::json;

    /// Name of the table created by [`populated_space`].
    pub const ITEMS: &str = "items";

    /// Tags cycled through by [`populated_space`].
    pub const TAGS: [&str; 3] = ["red", "green", "blue"];

    /// Creates a space whose `items` table holds `count` records
    /// `{"name": "item-<n>", "tag": <tag>, "n": <n>, "id": <n>}`.
    pub fn populated_space(count: usize) -> TestSpace {
        let test_space = TestSpace::memory();
        test_space
            .create_table(ITEMS, Some(TableConfig::new().id_method("increment")))
            .expect("Failed to create table");

        for n in 0..count {
            let tag = TAGS[n % TAGS.len()];
            let record = json!({"name": format!("item-{n}"), "tag": tag, "n": n});
            test_space
                .add(ITEMS, record.as_object().expect("object literal"))
                .expect("Failed to add record");
        }

        test_space
    }

    /// Builds a record from a JSON object literal.
    pub fn record(value: serde_json::Value) -> Record {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("Expected a JSON object, got {other}"),
        }
    }
}
