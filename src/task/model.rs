// src/task/model.rs

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::task::descriptor::{SkipPredicate, TaskBody};
use crate::task::resource::ResourceName;

/// Position of a task in its resolved suite. Dependencies are stored as
/// indices into the same suite.
pub type TaskIndex = usize;

/// Lifecycle of a task within one run.
///
/// `Todo → Running → {Success, Error}` or `Todo → {Skipped, Error}` when a
/// dependency did not succeed. Terminal states are never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Todo,
    Running,
    Success,
    Error,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Success | TaskStatus::Error | TaskStatus::Skipped
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Running => "running",
            TaskStatus::Success => "success",
            TaskStatus::Error => "error",
            TaskStatus::Skipped => "skipped",
        };
        f.write_str(s)
    }
}

/// Why a task ended in [`TaskStatus::Error`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskFailure {
    /// The body returned an error (rendered with its full cause chain).
    Body(String),
    /// The body panicked.
    Panicked(String),
    /// Never ran because a dependency ended in error.
    DependencyFailed { dependency: String },
}

impl fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskFailure::Body(msg) => f.write_str(msg),
            TaskFailure::Panicked(msg) => write!(f, "task panicked: {msg}"),
            TaskFailure::DependencyFailed { dependency } => {
                write!(f, "dependency '{dependency}' failed")
            }
        }
    }
}

/// A resolved task. Only the runner changes its status and timing.
pub struct Task {
    id: String,
    name: String,
    status: TaskStatus,
    resources: Vec<ResourceName>,
    dependencies: Vec<TaskIndex>,
    start: Option<DateTime<Utc>>,
    duration: Option<Duration>,
    error: Option<TaskFailure>,
    body: Arc<dyn TaskBody>,
    skip: Option<SkipPredicate>,
}

impl Task {
    pub(crate) fn new(
        id: String,
        name: String,
        resources: Vec<ResourceName>,
        dependencies: Vec<TaskIndex>,
        body: Arc<dyn TaskBody>,
        skip: Option<SkipPredicate>,
    ) -> Self {
        Self {
            id,
            name,
            status: TaskStatus::Todo,
            resources,
            dependencies,
            start: None,
            duration: None,
            error: None,
            body,
            skip,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> TaskStatus {
        self.status
    }

    pub fn resources(&self) -> &[ResourceName] {
        &self.resources
    }

    pub fn dependencies(&self) -> &[TaskIndex] {
        &self.dependencies
    }

    /// Wall-clock time the body was invoked.
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.start
    }

    /// Time spent inside the body (lock waits excluded).
    pub fn duration(&self) -> Option<Duration> {
        self.duration
    }

    pub fn error(&self) -> Option<&TaskFailure> {
        self.error.as_ref()
    }

    pub(crate) fn body(&self) -> Arc<dyn TaskBody> {
        Arc::clone(&self.body)
    }

    pub(crate) fn should_skip(&self) -> bool {
        self.skip.as_ref().is_some_and(|predicate| predicate())
    }

    pub(crate) fn mark_running(&mut self) {
        self.transition(TaskStatus::Running);
    }

    pub(crate) fn mark_skipped(&mut self) {
        self.transition(TaskStatus::Skipped);
    }

    pub(crate) fn mark_dependency_failed(&mut self, dependency: &str) {
        self.transition(TaskStatus::Error);
        self.error = Some(TaskFailure::DependencyFailed {
            dependency: dependency.to_string(),
        });
    }

    pub(crate) fn finish(
        &mut self,
        start: DateTime<Utc>,
        duration: Duration,
        result: Result<(), TaskFailure>,
    ) {
        self.start = Some(start);
        self.duration = Some(duration);
        match result {
            Ok(()) => self.transition(TaskStatus::Success),
            Err(failure) => {
                self.transition(TaskStatus::Error);
                self.error = Some(failure);
            }
        }
    }

    fn transition(&mut self, next: TaskStatus) {
        let allowed = match (self.status, next) {
            (TaskStatus::Todo, TaskStatus::Running)
            | (TaskStatus::Todo, TaskStatus::Skipped)
            | (TaskStatus::Todo, TaskStatus::Error)
            | (TaskStatus::Running, TaskStatus::Success)
            | (TaskStatus::Running, TaskStatus::Error) => true,
            _ => false,
        };
        assert!(
            allowed,
            "illegal status transition for task '{}': {} -> {}",
            self.id, self.status, next
        );
        self.status = next;
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("status", &self.status)
            .field("resources", &self.resources)
            .field("dependencies", &self.dependencies)
            .field("duration", &self.duration)
            .field("error", &self.error)
            .finish_non_exhaustive()
    }
}
