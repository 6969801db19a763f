//! Error types for DataSpace core.

use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type DataSpaceResult<T> = Result<T, DataSpaceError>;

/// Errors that can occur in DataSpace operations.
#[derive(Debug, Error)]
pub enum DataSpaceError {
    /// Blob store error.
    #[error("storage error: {0}")]
    Storage(#[from] dataspace_storage::StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encode/decode error.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// Table was never created.
    #[error("table not found: {table}")]
    TableNotFound {
        /// Name of the table.
        table: String,
    },

    /// Identifier strategy descriptor is not recognized or malformed.
    #[error("ID method {method} is not valid")]
    InvalidIdMethod {
        /// The offending descriptor.
        method: String,
    },

    /// An update tried to set a field that may not change.
    #[error("update for table {table} has forbidden update field '{field}'")]
    ForbiddenFieldUpdate {
        /// The table being updated.
        table: String,
        /// The rejected field.
        field: String,
    },

    /// A criteria pattern failed to compile.
    #[error("invalid pattern for field {field}: {source}")]
    InvalidPattern {
        /// The field the pattern was given for.
        field: String,
        /// The compile error.
        #[source]
        source: regex::Error,
    },

    /// The space has been closed.
    #[error("dataspace is closed")]
    Closed,
}

impl DataSpaceError {
    /// Creates a table not found error.
    pub fn table_not_found(table: impl Into<String>) -> Self {
        Self::TableNotFound {
            table: table.into(),
        }
    }

    /// Creates an invalid id method error.
    pub fn invalid_id_method(method: impl Into<String>) -> Self {
        Self::InvalidIdMethod {
            method: method.into(),
        }
    }

    /// Creates a forbidden field update error.
    pub fn forbidden_field(table: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ForbiddenFieldUpdate {
            table: table.into(),
            field: field.into(),
        }
    }
}
