// src/config/mod.rs

//! Suite file loading and validation.
//!
//! - [`model`]: the TOML-backed data model.
//! - [`loader`]: read a suite file from disk.
//! - [`validate`]: `TryFrom<RawSuiteFile> for SuiteFile`.

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{DEFAULT_SUITE_FILE, load_and_validate, load_from_path};
pub use model::{ConfigSection, LockingSection, RawSuiteFile, SuiteFile, TaskConfig};
