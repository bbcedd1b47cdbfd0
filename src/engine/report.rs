// src/engine/report.rs

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::task::{Task, TaskFailure, TaskStatus};

/// Final state of one task, for reporting collaborators.
#[derive(Debug, Clone)]
pub struct TaskReport {
    pub id: String,
    pub name: String,
    pub status: TaskStatus,
    pub start: Option<DateTime<Utc>>,
    pub duration: Option<Duration>,
    pub error: Option<TaskFailure>,
}

impl From<&Task> for TaskReport {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id().to_string(),
            name: task.name().to_string(),
            status: task.status(),
            start: task.start(),
            duration: task.duration(),
            error: task.error().cloned(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub success: usize,
    pub error: usize,
    pub skipped: usize,
}

/// Every task of a finished run, in input order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub tasks: Vec<TaskReport>,
}

impl RunReport {
    pub(crate) fn from_tasks(tasks: &[Task]) -> Self {
        Self {
            tasks: tasks.iter().map(TaskReport::from).collect(),
        }
    }

    pub fn task(&self, id: &str) -> Option<&TaskReport> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn status_of(&self, id: &str) -> Option<TaskStatus> {
        self.task(id).map(|t| t.status)
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for task in &self.tasks {
            match task.status {
                TaskStatus::Success => counts.success += 1,
                TaskStatus::Error => counts.error += 1,
                TaskStatus::Skipped => counts.skipped += 1,
                TaskStatus::Todo | TaskStatus::Running => {}
            }
        }
        counts
    }

    /// No task ended in error.
    pub fn all_passed(&self) -> bool {
        self.counts().error == 0
    }
}
