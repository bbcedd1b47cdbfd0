// src/engine/runner.rs

//! The scheduling control loop.
//!
//! All scheduling decisions, status changes and lock bookkeeping happen on
//! the loop itself; task bodies run as separate Tokio tasks and report back
//! through a `JoinSet`. The loop only suspends while waiting for a body to
//! finish, for a lock backoff delay, or for a lease renewal tick.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tokio::task::JoinSet;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info};

use crate::dag::ResolvedSuite;
use crate::engine::observer::{NoopObserver, RunObserver};
use crate::engine::report::RunReport;
use crate::engine::RunnerOptions;
use crate::lock::{Backoff, LockingCoordinator};
use crate::lock::protocol::millis;
use crate::task::{Task, TaskFailure, TaskIndex, TaskStatus};

/// Exit status used when fail-fast stops the process.
pub const FAIL_FAST_EXIT_CODE: i32 = 1;

/// Completion message from a task body back to the control loop.
#[derive(Debug)]
struct Finished {
    index: TaskIndex,
    start: DateTime<Utc>,
    duration: Duration,
    result: Result<(), TaskFailure>,
}

/// What a `todo` task's dependencies allow right now.
enum Readiness {
    /// Some dependency has not reached a terminal state.
    Waiting,
    /// A dependency ended in error; carries its id.
    InheritError(String),
    /// A dependency was skipped.
    InheritSkip,
    Ready,
}

/// Runs a resolved suite to completion.
///
/// ```no_run
/// # async fn demo() -> suiterun::errors::Result<()> {
/// use suiterun::dag::resolve;
/// use suiterun::engine::{Runner, RunnerOptions};
/// use suiterun::lock::{LockingCoordinator, LockingOptions};
/// use suiterun::task::TaskDescriptor;
///
/// let suite = resolve(vec![
///     TaskDescriptor::new("a", || async { anyhow::Ok(()) }),
///     TaskDescriptor::new("b", || async { anyhow::Ok(()) }).after(["a"]),
/// ])?;
/// let report = Runner::new(
///     suite,
///     LockingCoordinator::new(LockingOptions::default()),
///     RunnerOptions { concurrency: 2, fail_fast: false },
/// )
/// .run()
/// .await;
/// assert!(report.all_passed());
/// # Ok(())
/// # }
/// ```
pub struct Runner {
    tasks: Vec<Task>,
    coordinator: LockingCoordinator,
    options: RunnerOptions,
    observer: Box<dyn RunObserver>,
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("tasks", &self.tasks)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Runner {
    pub fn new(suite: ResolvedSuite, coordinator: LockingCoordinator, options: RunnerOptions) -> Self {
        Self {
            tasks: suite.into_tasks(),
            coordinator,
            options,
            observer: Box::new(NoopObserver),
        }
    }

    pub fn with_observer(mut self, observer: impl RunObserver + 'static) -> Self {
        self.observer = Box::new(observer);
        self
    }

    /// Execute every task and return their final states.
    ///
    /// Panics if the loop ends with a task that is not terminal, or with
    /// resources still in the lock ledger: both are scheduler bugs.
    pub async fn run(mut self) -> RunReport {
        info!(
            tasks = self.tasks.len(),
            concurrency = self.options.concurrency,
            fail_fast = self.options.fail_fast,
            external_locks = self.coordinator.has_external(),
            "starting run"
        );

        let mut renew = self.coordinator.renew_interval().map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });

        match self.options.concurrency {
            0 => self.run_sequential(&mut renew).await,
            limit => self.run_parallel(limit, &mut renew).await,
        }

        self.assert_all_terminal();
        let report = RunReport::from_tasks(&self.tasks);
        let counts = report.counts();
        info!(
            success = counts.success,
            error = counts.error,
            skipped = counts.skipped,
            "run finished"
        );
        self.coordinator.shutdown();
        report
    }

    /// One task at a time, in input order, blocking on locks with backoff.
    async fn run_sequential(&mut self, renew: &mut Option<Interval>) {
        let mut in_flight: JoinSet<Finished> = JoinSet::new();
        let no_exclusions = HashSet::new();

        while let Some(index) = self.next_ready(&no_exclusions) {
            self.coordinator.acquire_eventually(&self.tasks[index]).await;
            self.start(index, &mut in_flight);
            if let Some(finished) = self.wait_for_completion(&mut in_flight, None, renew).await {
                self.complete(finished).await;
            }
        }
    }

    /// Up to `limit` bodies in flight. A ready task whose resources cannot
    /// be taken is passed over and retried on the next pass.
    async fn run_parallel(&mut self, limit: usize, renew: &mut Option<Interval>) {
        let mut in_flight: JoinSet<Finished> = JoinSet::new();
        let mut backoff = Backoff::new();

        loop {
            let mut passed_over: HashSet<TaskIndex> = HashSet::new();
            while in_flight.len() < limit {
                let Some(index) = self.next_ready(&passed_over) else {
                    break;
                };
                if self.coordinator.acquire(&self.tasks[index]).await {
                    self.start(index, &mut in_flight);
                    backoff.reset();
                } else {
                    passed_over.insert(index);
                }
            }

            let lock_blocked = !passed_over.is_empty();
            if in_flight.is_empty() && !lock_blocked {
                break;
            }

            // Locks held by other processes free up without any completion
            // here, so retry on a timer as well.
            let retry_after = lock_blocked.then(|| backoff.next_delay());
            if let Some(delay) = retry_after {
                debug!(
                    waiting = passed_over.len(),
                    in_flight = in_flight.len(),
                    delay_ms = millis(delay),
                    "ready tasks waiting on resources"
                );
            }

            if in_flight.is_empty() {
                if let Some(delay) = retry_after {
                    self.sleep_renewing(delay, renew).await;
                }
                continue;
            }

            if let Some(finished) = self.wait_for_completion(&mut in_flight, retry_after, renew).await {
                self.complete(finished).await;
            }
        }
    }

    /// First `todo` task (in input order, not in `exclude`) whose
    /// dependencies are all terminal.
    ///
    /// Tasks met on the way that inherit an error or skip from a dependency,
    /// or whose skip predicate holds, are settled here and the scan starts
    /// over, since settling can make earlier tasks ready.
    fn next_ready(&mut self, exclude: &HashSet<TaskIndex>) -> Option<TaskIndex> {
        'scan: loop {
            for index in 0..self.tasks.len() {
                if self.tasks[index].status() != TaskStatus::Todo || exclude.contains(&index) {
                    continue;
                }
                match self.readiness(index) {
                    Readiness::Waiting => continue,
                    Readiness::InheritError(dependency) => {
                        self.tasks[index].mark_dependency_failed(&dependency);
                        info!(task = %self.tasks[index].id(), %dependency, "not running: dependency failed");
                        self.observer.task_finished(&self.tasks[index]);
                        continue 'scan;
                    }
                    Readiness::InheritSkip => {
                        self.tasks[index].mark_skipped();
                        info!(task = %self.tasks[index].id(), "skipped: dependency skipped");
                        self.observer.task_finished(&self.tasks[index]);
                        continue 'scan;
                    }
                    Readiness::Ready if self.tasks[index].should_skip() => {
                        self.tasks[index].mark_skipped();
                        info!(task = %self.tasks[index].id(), "skipped");
                        self.observer.task_finished(&self.tasks[index]);
                        continue 'scan;
                    }
                    Readiness::Ready => return Some(index),
                }
            }
            return None;
        }
    }

    fn readiness(&self, index: TaskIndex) -> Readiness {
        let deps = self.tasks[index].dependencies();
        if deps.iter().any(|&d| !self.tasks[d].status().is_terminal()) {
            return Readiness::Waiting;
        }
        if let Some(&failed) = deps.iter().find(|&&d| self.tasks[d].status() == TaskStatus::Error) {
            return Readiness::InheritError(self.tasks[failed].name().to_string());
        }
        if deps.iter().any(|&d| self.tasks[d].status() == TaskStatus::Skipped) {
            return Readiness::InheritSkip;
        }
        Readiness::Ready
    }

    /// Mark `index` running and hand its body to the runtime.
    fn start(&mut self, index: TaskIndex, in_flight: &mut JoinSet<Finished>) {
        let task = &mut self.tasks[index];
        task.mark_running();
        info!(task = %task.id(), resources = ?task.resources(), "task started");
        let body = task.body();
        self.observer.task_started(&self.tasks[index]);

        in_flight.spawn(async move {
            let start = Utc::now();
            let started = Instant::now();
            // Separate spawn so a panicking body surfaces as a JoinError
            // instead of tearing down the completion future.
            let result = match tokio::spawn(body.run()).await {
                Ok(Ok(())) => Ok(()),
                Ok(Err(err)) => Err(TaskFailure::Body(format!("{err:#}"))),
                Err(join_err) => Err(TaskFailure::Panicked(panic_message(join_err))),
            };
            Finished {
                index,
                start,
                duration: started.elapsed(),
                result,
            }
        });
    }

    /// Wait for one body to finish, renewing leases meanwhile.
    ///
    /// Returns `None` when `give_up_after` elapses first.
    async fn wait_for_completion(
        &mut self,
        in_flight: &mut JoinSet<Finished>,
        give_up_after: Option<Duration>,
        renew: &mut Option<Interval>,
    ) -> Option<Finished> {
        let deadline = give_up_after.map(|d| Instant::now() + d);
        loop {
            tokio::select! {
                joined = in_flight.join_next() => {
                    return match joined {
                        Some(Ok(finished)) => Some(finished),
                        Some(Err(err)) => panic!("task completion future failed: {err}"),
                        None => None,
                    };
                }
                _ = sleep_until_opt(deadline) => return None,
                _ = tick(renew) => self.renew_running().await,
            }
        }
    }

    async fn sleep_renewing(&mut self, delay: Duration, renew: &mut Option<Interval>) {
        let deadline = Instant::now() + delay;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return,
                _ = tick(renew) => self.renew_running().await,
            }
        }
    }

    async fn renew_running(&self) {
        for task in self
            .tasks
            .iter()
            .filter(|t| t.status() == TaskStatus::Running && !t.resources().is_empty())
        {
            self.coordinator.renew(task).await;
        }
    }

    /// Release locks, record the outcome, apply fail-fast.
    async fn complete(&mut self, finished: Finished) {
        let Finished {
            index,
            start,
            duration,
            result,
        } = finished;

        self.coordinator.release(&self.tasks[index]).await;

        let task = &mut self.tasks[index];
        task.finish(start, duration, result);
        let failed = match task.error() {
            None => {
                info!(task = %task.id(), duration_ms = millis(duration), "task passed");
                false
            }
            Some(failure) => {
                error!(
                    task = %task.id(),
                    at = %Local::now().to_rfc3339(),
                    duration_ms = millis(duration),
                    error = %failure,
                    "task failed"
                );
                true
            }
        };
        self.observer.task_finished(&self.tasks[index]);

        if failed && self.options.fail_fast {
            error!(task = %self.tasks[index].id(), "fail-fast: aborting run");
            std::process::exit(FAIL_FAST_EXIT_CODE);
        }
    }

    fn assert_all_terminal(&self) {
        let stuck: Vec<String> = self
            .tasks
            .iter()
            .filter(|t| !t.status().is_terminal())
            .map(|t| format!("{} ({})", t.id(), t.status()))
            .collect();
        assert!(
            stuck.is_empty(),
            "scheduler finished with non-terminal tasks: {stuck:?}"
        );
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

fn panic_message(err: tokio::task::JoinError) -> String {
    if !err.is_panic() {
        return err.to_string();
    }
    let payload = err.into_panic();
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
