// src/engine/observer.rs

//! Outcome callbacks for collaborators that render progress.

use std::io::Write;

use crate::task::{Task, TaskStatus};

/// Notified by the runner as tasks start and reach a terminal state.
///
/// Called from the control loop, so implementations should return quickly.
/// Tasks that never run (skipped, or failed through a dependency) only see
/// `task_finished`.
pub trait RunObserver: Send {
    fn task_started(&mut self, _task: &Task) {}
    fn task_finished(&mut self, _task: &Task) {}
}

/// Observer that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl RunObserver for NoopObserver {}

/// One line per finished task on stdout, e.g. `  ok    build (1.204s)`.
#[derive(Debug, Default)]
pub struct StatusLine;

impl StatusLine {
    pub fn render(task: &Task) -> String {
        let label = match task.status() {
            TaskStatus::Success => "ok",
            TaskStatus::Error => "FAIL",
            TaskStatus::Skipped => "skip",
            TaskStatus::Todo | TaskStatus::Running => "??",
        };
        let mut line = format!("  {label:<5} {}", task.name());
        if let Some(duration) = task.duration() {
            line.push_str(&format!(" ({:.3}s)", duration.as_secs_f64()));
        }
        if let Some(err) = task.error() {
            line.push_str(&format!(" - {err}"));
        }
        line
    }
}

impl RunObserver for StatusLine {
    fn task_finished(&mut self, task: &Task) {
        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", Self::render(task));
    }
}
