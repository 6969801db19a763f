//! DataSpace facade.

use crate::config::Config;
use crate::error::{DataSpaceError, DataSpaceResult};
use crate::id::{IdGenerator, IdRegistry};
use crate::isolate;
use crate::matcher::Criteria;
use crate::scheduler::SaveScheduler;
use crate::space::{Record, Space, TableConfig, ID_FIELD};
use crate::status::OperationStatus;
use dataspace_storage::{BlobStore, FileBlobStore, InMemoryBlobStore};
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// State reachable from the flush ticker.
struct Shared {
    space: Mutex<Space>,
    store: Box<dyn BlobStore>,
    flushes: AtomicU64,
}

impl Shared {
    /// Encodes the space and replaces the stored blob.
    ///
    /// The space lock is held for the whole write, so no mutation can
    /// interleave with a flush.
    fn write_space(&self) -> DataSpaceResult<()> {
        let space = self.space.lock();
        let data = space.encode()?;
        self.store.write(&data)?;
        let flushes = self.flushes.fetch_add(1, Ordering::AcqRel) + 1;
        debug!(bytes = data.len(), flushes, "space flushed");
        Ok(())
    }
}

/// Whether `record` needs an id assigned.
fn lacks_id(record: &Record) -> bool {
    record.get(ID_FIELD).map_or(true, Value::is_null)
}

/// An open space: named tables of JSON records persisted as one document.
///
/// `DataSpace` is the only public surface of the engine. Every record that
/// crosses it is copied, so callers never share state with the stored
/// space.
///
/// # Opening a Space
///
/// ```rust,no_run
/// use dataspace_core::{Config, Criteria, DataSpace, TableConfig};
/// use serde_json::json;
///
/// // Backed by `data/app.json`, flushed at most every 500 ms.
/// let space = DataSpace::open_with_config("data", "app", Config::new().save_timeout(500))?;
///
/// space.create_table("users", Some(TableConfig::new().id_method("increment")))?;
/// let user = space.add("users", json!({"name": "ada"}).as_object().unwrap())?;
/// assert_eq!(user["id"], json!(0));
///
/// let found = space.get_one("users", &Criteria::new().eq("name", "ada"), None);
/// assert!(found.is_some());
///
/// space.close()?;
/// # Ok::<(), dataspace_core::DataSpaceError>(())
/// ```
///
/// # Thread Safety
///
/// All methods take `&self`; the space is guarded by an internal lock, so a
/// `DataSpace` can be shared behind an `Arc`. Each call is atomic on its
/// own; there are no multi-call transactions.
pub struct DataSpace {
    config: Config,
    path: Option<PathBuf>,
    shared: Arc<Shared>,
    scheduler: SaveScheduler,
    ids: RwLock<IdRegistry>,
    closed: AtomicBool,
}

impl DataSpace {
    /// Opens the space `name` stored in `dir`, flushing on every mutation.
    ///
    /// The document lives at `<dir>/<name>.json`. The directory and an
    /// empty document are created if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created or read,
    /// or if the file is not a space document.
    pub fn open(dir: impl AsRef<Path>, name: &str) -> DataSpaceResult<Self> {
        Self::open_with_config(dir, name, Config::default())
    }

    /// Opens the space `name` stored in `dir` with custom configuration.
    ///
    /// # Errors
    ///
    /// See [`DataSpace::open`].
    pub fn open_with_config(
        dir: impl AsRef<Path>,
        name: &str,
        config: Config,
    ) -> DataSpaceResult<Self> {
        let store = FileBlobStore::for_space(dir, name);
        let path = store.path().to_path_buf();
        Self::open_inner(Box::new(store), Some(path), config)
    }

    /// Opens a space on any blob store.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be initialized or read, or holds
    /// something other than a space document.
    pub fn open_with_store(store: Box<dyn BlobStore>, config: Config) -> DataSpaceResult<Self> {
        Self::open_inner(store, None, config)
    }

    /// Opens an ephemeral space for testing.
    ///
    /// # Errors
    ///
    /// Only fails if the empty document cannot be encoded.
    pub fn open_in_memory() -> DataSpaceResult<Self> {
        Self::open_with_store(Box::new(InMemoryBlobStore::new()), Config::default())
    }

    fn open_inner(
        store: Box<dyn BlobStore>,
        path: Option<PathBuf>,
        config: Config,
    ) -> DataSpaceResult<Self> {
        store.ensure_directory()?;
        if !store.exists()? {
            store.write(&Space::new().encode()?)?;
        }
        let space = Space::decode(&store.read()?)?;

        info!(
            path = ?path,
            tables = space.tables.len(),
            records = space.record_count(),
            save_timeout_ms = config.save_timeout_ms,
            "dataspace opened"
        );

        let shared = Arc::new(Shared {
            space: Mutex::new(space),
            store,
            flushes: AtomicU64::new(0),
        });

        let scheduler = SaveScheduler::new(config.interval());
        let weak = Arc::downgrade(&shared);
        scheduler.start(move || match weak.upgrade() {
            Some(shared) => shared.write_space(),
            None => Ok(()),
        })?;

        Ok(Self {
            config,
            path,
            shared,
            scheduler,
            ids: RwLock::new(IdRegistry::new()),
            closed: AtomicBool::new(false),
        })
    }

    /// Path of the backing document, for file-backed spaces.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The configuration this space was opened with.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers a custom identifier strategy usable as `idMethod`.
    ///
    /// # Errors
    ///
    /// Returns [`DataSpaceError::InvalidIdMethod`] for empty names, names with
    /// whitespace, or names of built-in strategies.
    pub fn register_id_method(
        &self,
        name: impl Into<String>,
        generator: impl IdGenerator + 'static,
    ) -> DataSpaceResult<()> {
        self.ids.write().register(name, Arc::new(generator))
    }

    /// Creates a table, or updates its configuration if it exists.
    ///
    /// Existing records are never touched. When `config` is given its
    /// trimmed `id_method` is stored (an empty string clears it) and the
    /// table's increment counter is kept unless `config.last_index` is set.
    /// Always triggers a save.
    ///
    /// # Errors
    ///
    /// Returns [`DataSpaceError::InvalidIdMethod`] for an unknown strategy
    /// (nothing is changed), or a storage error from an immediate flush.
    pub fn create_table(&self, table: &str, config: Option<TableConfig>) -> DataSpaceResult<()> {
        self.ensure_open()?;

        let method = config
            .as_ref()
            .and_then(|config| config.id_method.as_deref())
            .map(str::trim)
            .filter(|method| !method.is_empty())
            .map(str::to_string);
        if let Some(method) = &method {
            self.ids.read().parse(method)?;
        }

        {
            let mut space = self.shared.space.lock();
            let created = space.ensure_table(table);
            if let Some(config) = config {
                let entry = space.config.entry(table.to_string()).or_default();
                entry.id_method = method;
                if config.last_index.is_some() {
                    entry.last_index = config.last_index;
                }
            }
            debug!(table, created, "table ensured");
        }

        self.mark_dirty()
    }

    /// Deletes a table and its configuration. Always triggers a save.
    ///
    /// # Errors
    ///
    /// Returns a storage error from an immediate flush.
    pub fn remove_table(&self, table: &str) -> DataSpaceResult<()> {
        self.ensure_open()?;
        let existed = self.shared.space.lock().remove_table(table);
        debug!(table, existed, "table removed");
        self.mark_dirty()
    }

    /// Whether `table` exists.
    #[must_use]
    pub fn has_table(&self, table: &str) -> bool {
        self.shared.space.lock().has_table(table)
    }

    /// Names of all tables, sorted.
    #[must_use]
    pub fn table_names(&self) -> Vec<String> {
        self.shared.space.lock().tables.keys().cloned().collect()
    }

    /// Configuration of `table`, if it has one.
    #[must_use]
    pub fn table_config(&self, table: &str) -> Option<TableConfig> {
        self.shared.space.lock().config.get(table).cloned()
    }

    /// Number of records in `table` (zero if it does not exist).
    #[must_use]
    pub fn len(&self, table: &str) -> usize {
        self.shared.space.lock().table(table).map_or(0, <[Record]>::len)
    }

    /// Appends a copy of `record` to `table` and returns a copy of what was
    /// stored.
    ///
    /// If the table has an `idMethod` and the record has no `id` (or a null
    /// one), an id is generated.
    ///
    /// # Errors
    ///
    /// - [`DataSpaceError::TableNotFound`] if the table was never created
    /// - [`DataSpaceError::InvalidIdMethod`] if the stored strategy is unknown
    /// - A storage error from an immediate flush
    pub fn add(&self, table: &str, record: &Record) -> DataSpaceResult<Record> {
        self.ensure_open()?;
        let mut record = isolate::copy_record(record);

        let stored = {
            let mut space = self.shared.space.lock();
            if !space.has_table(table) {
                return Err(DataSpaceError::table_not_found(table));
            }

            if lacks_id(&record) {
                if let Some(config) = space.config.get_mut(table) {
                    if let Some(descriptor) = config.id_method.clone() {
                        let ids = self.ids.read();
                        let method = ids.parse(&descriptor)?;
                        let id = ids.generate(&method, table, config)?;
                        record.insert(ID_FIELD.to_string(), id);
                    }
                }
            }

            let stored = isolate::copy_record(&record);
            space
                .tables
                .get_mut(table)
                .ok_or_else(|| DataSpaceError::table_not_found(table))?
                .push(record);
            stored
        };

        self.mark_dirty()?;
        Ok(stored)
    }

    /// Removes the first record matching `criteria`.
    ///
    /// Returns whether a record was removed; saves only in that case.
    ///
    /// # Errors
    ///
    /// Returns a storage error from an immediate flush.
    pub fn remove_one(&self, table: &str, criteria: &Criteria) -> DataSpaceResult<bool> {
        self.ensure_open()?;
        let removed = self.shared.space.lock().remove_first(table, criteria);
        if removed {
            self.mark_dirty()?;
        }
        Ok(removed)
    }

    /// Removes every record matching `criteria`, keeping the others in order.
    ///
    /// Returns the number removed; saves only if it is non-zero.
    ///
    /// # Errors
    ///
    /// Returns a storage error from an immediate flush.
    pub fn remove_items(&self, table: &str, criteria: &Criteria) -> DataSpaceResult<usize> {
        self.ensure_open()?;
        let removed = self.shared.space.lock().remove_matching(table, criteria);
        if removed > 0 {
            debug!(table, removed, "records removed");
            self.mark_dirty()?;
        }
        Ok(removed)
    }

    /// Merges `new_values` into the single record matching `criteria`.
    ///
    /// Zero or several matches leave everything unchanged and come back as a
    /// failed [`OperationStatus`].
    ///
    /// # Errors
    ///
    /// - [`DataSpaceError::ForbiddenFieldUpdate`] if `new_values` sets `id`,
    ///   checked before any matching
    /// - A storage error from an immediate flush
    pub fn change(
        &self,
        table: &str,
        criteria: &Criteria,
        new_values: &Record,
    ) -> DataSpaceResult<OperationStatus> {
        self.update(table, criteria, new_values, false)
    }

    /// Like [`DataSpace::change`], but afterwards drops every field not named
    /// in `new_values`. The `id` field is always kept.
    ///
    /// # Errors
    ///
    /// Same as [`DataSpace::change`].
    pub fn replace(
        &self,
        table: &str,
        criteria: &Criteria,
        new_values: &Record,
    ) -> DataSpaceResult<OperationStatus> {
        self.update(table, criteria, new_values, true)
    }

    fn update(
        &self,
        table: &str,
        criteria: &Criteria,
        new_values: &Record,
        full: bool,
    ) -> DataSpaceResult<OperationStatus> {
        self.ensure_open()?;
        if new_values.contains_key(ID_FIELD) {
            return Err(DataSpaceError::forbidden_field(table, ID_FIELD));
        }

        {
            let mut space = self.shared.space.lock();
            let index = match space.positions(table, criteria).as_slice() {
                [] => return Ok(OperationStatus::no_match(criteria)),
                [index] => *index,
                _ => return Ok(OperationStatus::ambiguous_match(criteria)),
            };
            let Some(target) = space
                .tables
                .get_mut(table)
                .and_then(|records| records.get_mut(index))
            else {
                return Ok(OperationStatus::no_match(criteria));
            };

            for (field, value) in new_values {
                target.insert(field.clone(), isolate::copy_value(value));
            }
            if full {
                target.retain(|field, _| field == ID_FIELD || new_values.contains_key(field));
            }
        }

        self.mark_dirty()?;
        Ok(OperationStatus::ok())
    }

    /// Returns a copy of the first record matching `criteria`.
    ///
    /// With non-empty `optional` criteria, the first match that also passes
    /// at least one optional field is preferred; if there is none, the first
    /// record matching `criteria` alone is returned.
    #[must_use]
    pub fn get_one(
        &self,
        table: &str,
        criteria: &Criteria,
        optional: Option<&Criteria>,
    ) -> Option<Record> {
        let optional = optional.filter(|optional| !optional.is_empty());
        let space = self.shared.space.lock();
        let mut matches = space
            .table(table)?
            .iter()
            .filter(|record| criteria.matches(record));

        let Some(optional) = optional else {
            return isolate::copy_optional(matches.next());
        };

        let mut fallback = None;
        for record in matches {
            if optional.matches_any(record) {
                return Some(isolate::copy_record(record));
            }
            fallback.get_or_insert(record);
        }
        isolate::copy_optional(fallback)
    }

    /// Returns copies of every record matching `criteria`.
    ///
    /// With non-empty `optional` criteria, a record must also pass at least
    /// one optional field to be included.
    #[must_use]
    pub fn get_items(
        &self,
        table: &str,
        criteria: &Criteria,
        optional: Option<&Criteria>,
    ) -> Vec<Record> {
        let optional = optional.filter(|optional| !optional.is_empty());
        let space = self.shared.space.lock();
        let Some(records) = space.table(table) else {
            return Vec::new();
        };

        records
            .iter()
            .filter(|record| criteria.matches(record))
            .filter(|record| optional.map_or(true, |optional| optional.matches_any(record)))
            .map(isolate::copy_record)
            .collect()
    }

    /// Returns a copy of every record in `table`, or `None` if it does not
    /// exist.
    #[must_use]
    pub fn get_table(&self, table: &str) -> Option<Vec<Record>> {
        let space = self.shared.space.lock();
        space.table(table).map(isolate::copy_table)
    }

    /// Returns a copy of the whole space document.
    #[must_use]
    pub fn snapshot(&self) -> Space {
        self.shared.space.lock().clone()
    }

    /// Writes the space to its blob store.
    ///
    /// Writes if there are unflushed changes, if `force` is set, or always
    /// in immediate mode. Returns whether a write happened.
    ///
    /// # Errors
    ///
    /// Returns a codec or storage error; unflushed changes stay pending.
    pub fn save(&self, force: bool) -> DataSpaceResult<bool> {
        let pending = self.scheduler.take_dirty();
        if !(pending || force || self.scheduler.is_immediate()) {
            return Ok(false);
        }
        if let Err(err) = self.shared.write_space() {
            if pending {
                self.scheduler.notify_dirty();
            }
            return Err(err);
        }
        Ok(true)
    }

    /// Whether changes are waiting for the next flush.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.scheduler.is_dirty()
    }

    /// Number of successful flushes since the space was opened.
    #[must_use]
    pub fn flush_count(&self) -> u64 {
        self.shared.flushes.load(Ordering::Acquire)
    }

    /// Stops background flushing and writes any pending changes.
    ///
    /// Further mutations fail with [`DataSpaceError::Closed`]; reads keep
    /// working. Idempotent once it has succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if the final flush fails. The space then stays open
    /// with its changes pending, and background flushing stays stopped.
    pub fn close(&self) -> DataSpaceResult<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.scheduler.stop();
        if self.scheduler.is_dirty() {
            if let Err(err) = self.save(false) {
                // Stay open so a later close, or Drop, retries the flush.
                self.closed.store(false, Ordering::Release);
                return Err(err);
            }
        }
        info!(path = ?self.path, flushes = self.flush_count(), "dataspace closed");
        Ok(())
    }

    /// Whether [`DataSpace::close`] has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn ensure_open(&self) -> DataSpaceResult<()> {
        if self.is_closed() {
            return Err(DataSpaceError::Closed);
        }
        Ok(())
    }

    fn mark_dirty(&self) -> DataSpaceResult<()> {
        self.scheduler.notify_dirty();
        if self.scheduler.is_immediate() {
            self.save(false)?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for DataSpace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSpace")
            .field("path", &self.path)
            .field("config", &self.config)
            .field("scheduler", &self.scheduler)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl Drop for DataSpace {
    fn drop(&mut self) {
        let _ = self.close();
    }
}


/// Persistence tests that require a real file system.
#[cfg(test)]
mod persistence_tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn tables_persist_across_restarts() {
        let temp = tempdir().unwrap();
        let dir = temp.path().join("spaces");

        // First session: create tables and data
        {
            let space = DataSpace::open(&dir, "app").unwrap();
            space
                .create_table("users", Some(TableConfig::new().id_method("increment")))
                .unwrap();
            space.add("users", &record(json!({"name": "ada"}))).unwrap();
            space.add("users", &record(json!({"name": "bob"}))).unwrap();
            space.close().unwrap();
        }

        // Second session: verify tables, records and counters
        {
            let space = DataSpace::open(&dir, "app").unwrap();
            assert_eq!(space.table_names(), ["users"]);
            assert_eq!(space.len("users"), 2);
            assert_eq!(space.table_config("users").unwrap().last_index, Some(1));

            let next = space.add("users", &record(json!({"name": "cy"}))).unwrap();
            assert_eq!(next["id"], json!(2));
        }
    }

    #[test]
    fn debounced_changes_persist_on_close() {
        let temp = tempdir().unwrap();
        let config = Config::new().save_timeout(60_000);

        {
            let space = DataSpace::open_with_config(temp.path(), "app", config).unwrap();
            space.create_table("t", None).unwrap();
            space.add("t", &record(json!({"v": 1}))).unwrap();
            assert_eq!(space.flush_count(), 0);
        }

        let space = DataSpace::open_with_config(temp.path(), "app", config).unwrap();
        assert_eq!(space.get_table("t").unwrap(), [record(json!({"v": 1}))]);
    }

    #[test]
    fn separate_names_are_separate_documents() {
        let temp = tempdir().unwrap();
        let left = DataSpace::open(temp.path(), "left").unwrap();
        let right = DataSpace::open(temp.path(), "right").unwrap();

        left.create_table("only_left", None).unwrap();
        assert!(!right.has_table("only_left"));
        assert!(temp.path().join("left.json").exists());
        assert!(temp.path().join("right.json").exists());
    }
}
