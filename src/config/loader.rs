// src/config/loader.rs

use std::fs;
use std::path::Path;

use crate::config::model::{RawSuiteFile, SuiteFile};
use crate::errors::Result;

/// Read and deserialize a suite file without semantic validation.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawSuiteFile> {
    let contents = fs::read_to_string(path.as_ref())?;
    let raw: RawSuiteFile = toml::from_str(&contents)?;
    Ok(raw)
}

/// Read, deserialize and validate a suite file.
///
/// Rejects: no tasks, bad `[locking]` values, invalid resource names,
/// duplicate ids, unknown `after` ids and dependency cycles.
pub fn load_and_validate(path: impl AsRef<Path>) -> Result<SuiteFile> {
    let raw = load_from_path(path)?;
    SuiteFile::try_from(raw)
}

/// Suite file looked up when `--config` is not given.
pub const DEFAULT_SUITE_FILE: &str = "Suite.toml";
