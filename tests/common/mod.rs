#![allow(dead_code)]

use std::time::Duration;

use suiterun::dag::resolve;
use suiterun::engine::{RunReport, Runner, RunnerOptions};
use suiterun::lock::{LockingCoordinator, LockingOptions};
use suiterun::task::TaskDescriptor;

pub use suiterun_test_utils::{init_tracing, with_timeout};

pub type TestResult = Result<(), Box<dyn std::error::Error>>;

pub fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Resolve and run `descriptors` with in-process locking only.
pub async fn run_local(descriptors: Vec<TaskDescriptor>, concurrency: usize) -> RunReport {
    let suite = resolve(descriptors).expect("suite should resolve");
    Runner::new(
        suite,
        LockingCoordinator::new(LockingOptions::default()),
        RunnerOptions {
            concurrency,
            fail_fast: false,
        },
    )
    .run()
    .await
}
