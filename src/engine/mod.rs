// src/engine/mod.rs

//! Task scheduling engine.
//!
//! - [`runner`] owns the control loop: selection, concurrency bound, lock
//!   acquisition/release, failure propagation and run completion.
//! - [`observer`] is the callback surface for progress rendering.
//! - [`report`] is the per-run result handed to reporting collaborators.

pub mod observer;
pub mod report;
pub mod runner;

pub use observer::{NoopObserver, RunObserver, StatusLine};
pub use report::{RunReport, StatusCounts, TaskReport};
pub use runner::{FAIL_FAST_EXIT_CODE, Runner};

/// Options for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Maximum bodies in flight; `0` runs tasks one at a time in input order.
    pub concurrency: usize,
    /// Terminate the process on the first task error.
    pub fail_fast: bool,
}
