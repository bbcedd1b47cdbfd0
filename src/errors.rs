// src/errors.rs

//! Crate-wide error aliases and helpers.
//!
//! Everything in here is a setup-time failure: a suite that produces one of
//! these never starts running. Lock conflicts and task failures are not
//! errors at this level (see `lock::LockOutcome` and `task::TaskFailure`).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SuiteError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("duplicate task id '{id}'")]
    DuplicateTask { id: String },

    #[error("task '{task}' runs after unknown task '{missing}'")]
    DependencyNotFound { missing: String, task: String },

    #[error("circular dependency detected involving task '{task}'")]
    CircularDependency { task: String },

    #[error("task '{task}' declares invalid resource name '{resource}' (expected [-A-Za-z_0-9]+)")]
    InvalidResource { task: String, resource: String },
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SuiteError>;
