// src/config/validate.rs

use crate::config::model::{RawSuiteFile, SuiteFile};
use crate::dag::{parse_resources, validate_graph};
use crate::errors::{Result, SuiteError};
use crate::lock::MAX_LEASE;

impl TryFrom<RawSuiteFile> for SuiteFile {
    type Error = SuiteError;

    fn try_from(raw: RawSuiteFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_suite(&raw)?;
        Ok(SuiteFile::new_unchecked(raw.config, raw.locking, raw.task))
    }
}

fn validate_raw_suite(cfg: &RawSuiteFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_locking(cfg)?;
    validate_tasks(cfg)?;
    validate_graph(cfg.task.iter().map(|t| (t.id.as_str(), t.after.as_slice())))?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawSuiteFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(SuiteError::Config(
            "suite must contain at least one [[task]] entry".to_string(),
        ));
    }
    Ok(())
}

fn validate_locking(cfg: &RawSuiteFile) -> Result<()> {
    let locking = &cfg.locking;
    let max = MAX_LEASE.as_millis() as u64;

    if locking.lease_ms == 0 || locking.lease_ms > max {
        return Err(SuiteError::Config(format!(
            "[locking].lease_ms must be between 1 and {max} (got {})",
            locking.lease_ms
        )));
    }

    if let Some(url) = &locking.url {
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| SuiteError::Config(format!("[locking].url {url:?} is not a URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(SuiteError::Config(format!(
                "[locking].url must use http or https (got {url:?})"
            )));
        }
    }

    if locking.client.as_deref().is_some_and(str::is_empty) {
        return Err(SuiteError::Config(
            "[locking].client must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_tasks(cfg: &RawSuiteFile) -> Result<()> {
    for task in &cfg.task {
        if task.id.trim().is_empty() {
            return Err(SuiteError::Config("task with empty `id`".to_string()));
        }
        if task.cmd.trim().is_empty() {
            return Err(SuiteError::Config(format!(
                "task '{}' has an empty `cmd`",
                task.id
            )));
        }
        parse_resources(&task.id, &task.resources)?;
    }
    Ok(())
}
