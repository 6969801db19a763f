//! # DataSpace Storage
//!
//! Durable blob store trait and implementations for DataSpace.
//!
//! A space is persisted as a single document. Blob stores are **opaque
//! whole-document stores** - they do not interpret the bytes they hold.
//!
//! ## Design Principles
//!
//! - Stores hold exactly one blob (read whole, write whole)
//! - No knowledge of the JSON document layout
//! - Must be `Send + Sync` so a background flush can reach them
//! - DataSpace owns all format interpretation
//!
//! ## Available Stores
//!
//! - [`InMemoryBlobStore`] - For testing and ephemeral spaces
//! - [`FileBlobStore`] - For persistent spaces using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use dataspace_storage::{BlobStore, InMemoryBlobStore};
//!
//! let store = InMemoryBlobStore::new();
//! assert!(!store.exists().unwrap());
//! store.write(b"{}").unwrap();
//! assert_eq!(store.read().unwrap(), b"{}");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::BlobStore;
pub use error::{StorageError, StorageResult};
pub use file::FileBlobStore;
pub use memory::InMemoryBlobStore;
