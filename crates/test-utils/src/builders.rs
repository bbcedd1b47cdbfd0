#![allow(dead_code)]

use suiterun::config::{ConfigSection, LockingSection, RawSuiteFile, SuiteFile, TaskConfig};

/// Builder for `SuiteFile` to simplify test setup.
pub struct SuiteFileBuilder {
    raw: RawSuiteFile,
}

impl SuiteFileBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawSuiteFile {
                config: ConfigSection::default(),
                locking: LockingSection::default(),
                task: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, task: TaskConfig) -> Self {
        self.raw.task.push(task);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.raw.config.concurrency = n;
        self
    }

    pub fn fail_fast(mut self) -> Self {
        self.raw.config.fail_fast = true;
        self
    }

    pub fn lock_url(mut self, url: &str) -> Self {
        self.raw.locking.url = Some(url.to_string());
        self
    }

    pub fn lease_ms(mut self, ms: u64) -> Self {
        self.raw.locking.lease_ms = ms;
        self
    }

    pub fn build_raw(self) -> RawSuiteFile {
        self.raw
    }

    pub fn build(self) -> SuiteFile {
        SuiteFile::try_from(self.raw).expect("Failed to build valid suite from builder")
    }
}

impl Default for SuiteFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(id: &str, cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                id: id.to_string(),
                name: None,
                cmd: cmd.to_string(),
                after: vec![],
                resources: vec![],
                skip: false,
            },
        }
    }

    pub fn name(mut self, name: &str) -> Self {
        self.task.name = Some(name.to_string());
        self
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn resource(mut self, resource: &str) -> Self {
        self.task.resources.push(resource.to_string());
        self
    }

    pub fn skip(mut self) -> Self {
        self.task.skip = true;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
