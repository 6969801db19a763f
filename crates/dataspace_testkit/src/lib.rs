//! # DataSpace Testkit
//!
//! Test utilities for DataSpace.
//!
//! This crate provides:
//! - Test fixtures and space helpers
//! - Property-based test generators using proptest
//! - A model-checking harness for operation sequences
//! - Tracing setup for tests
//!
//! ## Usage
//!
//! ```rust
//! use dataspace_testkit::prelude::*;
//!
//! with_temp_space(|space| {
//!     space.create_table("test", None).unwrap();
//!     // ... test operations
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod integration;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::integration::*;
}

pub use fixtures::*;
pub use generators::*;
pub use integration::*;
