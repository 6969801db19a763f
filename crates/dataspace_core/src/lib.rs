//! # DataSpace Core
//!
//! Embedded JSON document store.
//!
//! A space is a set of named tables, each an ordered list of JSON records,
//! persisted together as one JSON document. This crate provides:
//! - [`DataSpace`], the engine facade (tables, records, queries, saving)
//! - [`Criteria`], exact-value and regular-expression record matching
//! - Identifier strategies for tables that assign `id` automatically
//! - Immediate or debounced persistence through [`SaveScheduler`]
//!
//! ## Example
//!
//! ```rust
//! use dataspace_core::{Criteria, DataSpace, TableConfig};
//! use serde_json::json;
//!
//! let space = DataSpace::open_in_memory().unwrap();
//! space
//!     .create_table("notes", Some(TableConfig::new().id_method("increment")))
//!     .unwrap();
//!
//! let note = json!({"title": "groceries", "done": false});
//! let stored = space.add("notes", note.as_object().unwrap()).unwrap();
//! assert_eq!(stored["id"], json!(0));
//!
//! let open = space.get_items("notes", &Criteria::new().eq("done", false), None);
//! assert_eq!(open.len(), 1);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod dataspace;
mod error;
mod id;
pub mod isolate;
mod matcher;
mod scheduler;
mod space;
mod status;

pub use config::Config;
pub use dataspace::DataSpace;
pub use error::{DataSpaceError, DataSpaceResult};
pub use id::{IdGenerator, IdMethod, IdRegistry, MAX_TIME_DIGITS};
pub use matcher::{matches, Criteria, Criterion};
pub use scheduler::SaveScheduler;
pub use space::{Record, Space, TableConfig, ID_FIELD};
pub use status::{FailureReason, OperationStatus, STATUS_FAILED, STATUS_OK};

pub use dataspace_storage::{
    BlobStore, FileBlobStore, InMemoryBlobStore, StorageError, StorageResult,
};
