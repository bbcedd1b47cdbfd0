// src/config/model.rs

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::engine::RunnerOptions;
use crate::exec::CommandBody;
use crate::lock::{DEFAULT_LEASE, LockingOptions, default_client_id};
use crate::task::TaskDescriptor;

/// Suite file exactly as deserialized from TOML, before validation.
///
/// ```toml
/// [config]
/// concurrency = 2
/// fail_fast = false
///
/// [locking]
/// url = "http://127.0.0.1:7878/locks"
/// lease_ms = 40000
///
/// [[task]]
/// id = "migrate"
/// cmd = "./migrate.sh"
/// resources = ["db"]
///
/// [[task]]
/// id = "api-tests"
/// cmd = "cargo test -p api"
/// after = ["migrate"]
/// resources = ["db"]
/// ```
///
/// Tasks are an array of tables so that file order is the input order the
/// sequential runner follows.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSuiteFile {
    #[serde(default)]
    pub config: ConfigSection,

    #[serde(default)]
    pub locking: LockingSection,

    #[serde(default)]
    pub task: Vec<TaskConfig>,
}

/// Validated suite file. Obtain one through `TryFrom<RawSuiteFile>` or
/// [`load_and_validate`](crate::config::load_and_validate).
#[derive(Debug, Clone)]
pub struct SuiteFile {
    pub config: ConfigSection,
    pub locking: LockingSection,
    pub task: Vec<TaskConfig>,
}

impl SuiteFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        locking: LockingSection,
        task: Vec<TaskConfig>,
    ) -> Self {
        Self {
            config,
            locking,
            task,
        }
    }

    pub fn runner_options(&self) -> RunnerOptions {
        RunnerOptions {
            concurrency: self.config.concurrency,
            fail_fast: self.config.fail_fast,
        }
    }

    pub fn locking_options(&self) -> LockingOptions {
        LockingOptions {
            enabled: self.locking.enabled,
            lease: self.locking.lease(),
            renew: self.locking.renew,
        }
    }

    /// Configured client id, or `<user>-<unix millis>`.
    pub fn client_id(&self) -> String {
        self.locking.client.clone().unwrap_or_else(default_client_id)
    }

    /// Task descriptors with shell-command bodies run from `workdir`.
    pub fn descriptors(&self, workdir: &Path) -> Vec<TaskDescriptor> {
        self.task
            .iter()
            .map(|t| {
                let body = CommandBody::new(&t.id, &t.cmd).in_dir(workdir);
                let mut descriptor = TaskDescriptor::new(&t.id, body)
                    .after(t.after.iter().cloned())
                    .resources(t.resources.iter().cloned())
                    .skip_if(t.skip);
                if let Some(name) = &t.name {
                    descriptor = descriptor.name(name);
                }
                descriptor
            })
            .collect()
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSection {
    /// Maximum tasks in flight; `0` (default) runs them one at a time.
    #[serde(default)]
    pub concurrency: usize,

    /// Exit the process on the first task error.
    #[serde(default)]
    pub fail_fast: bool,
}

/// `[locking]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct LockingSection {
    /// Master switch for resource locking (local and external).
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Lock service endpoint. Without it only same-process exclusion applies.
    #[serde(default)]
    pub url: Option<String>,

    /// Identity presented to the lock service.
    #[serde(default)]
    pub client: Option<String>,

    /// Lease requested per acquisition, in milliseconds (max 60000).
    #[serde(default = "default_lease_ms")]
    pub lease_ms: u64,

    /// Renew leases at half their lifetime while tasks run.
    #[serde(default = "default_true")]
    pub renew: bool,
}

impl LockingSection {
    pub fn lease(&self) -> Duration {
        Duration::from_millis(self.lease_ms)
    }
}

impl Default for LockingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            url: None,
            client: None,
            lease_ms: default_lease_ms(),
            renew: true,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_lease_ms() -> u64 {
    DEFAULT_LEASE.as_millis() as u64
}

/// One `[[task]]` entry.
#[derive(Debug, Clone, Deserialize)]
pub struct TaskConfig {
    /// Unique id used by `after` references.
    pub id: String,

    /// Display name; defaults to `id`.
    #[serde(default)]
    pub name: Option<String>,

    /// Shell command to run.
    pub cmd: String,

    /// Ids of tasks that must finish first.
    #[serde(default)]
    pub after: Vec<String>,

    /// Resources needed exclusively while the command runs.
    #[serde(default)]
    pub resources: Vec<String>,

    /// Mark the task skipped instead of running it.
    #[serde(default)]
    pub skip: bool,
}
