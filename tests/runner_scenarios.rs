mod common;

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use suiterun::dag::resolve;
use suiterun::engine::{RunReport, Runner, RunnerOptions, StatusCounts};
use suiterun::lock::{LeaseConflict, LockOutcome, LockingCoordinator, LockingOptions};
use suiterun::task::{TaskDescriptor, TaskFailure, TaskStatus};
use suiterun_test_utils::fake_lock_client::ScriptedLockClient;
use suiterun_test_utils::probe::Probe;

use common::{init_tracing, ms, run_local, with_timeout};

#[tokio::test]
async fn dependencies_and_resources_gate_starts() {
    init_tracing();
    let probe = Probe::new();
    let report = with_timeout(run_local(
        vec![
            probe.task("A", ms(50)),
            probe.task("B", ms(100)).resources(["x"]),
            probe.task("C", ms(20)).after(["B"]).resources(["x"]),
            probe.task("D", ms(20)).after(["B"]),
        ],
        2,
    ))
    .await;

    assert!(report.all_passed());
    let first_two: HashSet<String> = probe.started().into_iter().take(2).collect();
    assert_eq!(first_two, HashSet::from(["A".to_string(), "B".to_string()]));
    assert!(probe.finished_before("B", "C"));
    assert!(probe.finished_before("B", "D"));
    assert!(probe.max_in_flight() <= 2);
}

#[tokio::test]
async fn shared_resource_serializes_otherwise_independent_tasks() {
    init_tracing();
    let probe = Probe::new();
    let report = with_timeout(run_local(
        vec![
            probe.task("w1", ms(60)).resources(["widget"]),
            probe.task("w2", ms(60)).resources(["widget"]),
            probe.task("free", ms(60)),
        ],
        4,
    ))
    .await;

    assert!(report.all_passed());
    assert!(probe.disjoint("w1", "w2"), "events: {:?}", probe.events());
    // the task without resources is not held back
    assert_eq!(probe.max_in_flight(), 2);
}

#[tokio::test]
async fn concurrency_limit_is_respected() {
    init_tracing();
    let probe = Probe::new();
    let tasks = (0..6)
        .map(|i| probe.task(&format!("t{i}"), ms(40)))
        .collect();
    let report = with_timeout(run_local(tasks, 3)).await;

    assert_eq!(report.counts().success, 6);
    assert_eq!(probe.max_in_flight(), 3);
}

#[tokio::test]
async fn sequential_mode_follows_input_order() {
    init_tracing();
    let probe = Probe::new();
    let report = with_timeout(run_local(
        vec![
            probe.task("x", ms(5)).after(["y"]),
            probe.task("y", ms(5)),
            probe.task("z", ms(5)),
        ],
        0,
    ))
    .await;

    assert!(report.all_passed());
    assert_eq!(probe.started(), vec!["y", "x", "z"]);
    assert_eq!(probe.max_in_flight(), 1);
}

#[tokio::test]
async fn failure_spreads_to_dependents_only() {
    init_tracing();
    let probe = Probe::new();
    let report = with_timeout(run_local(
        vec![
            probe.failing_task("a", ms(10), "exit status 3"),
            probe.task("b", ms(10)).after(["a"]),
            probe.task("c", ms(10)).after(["b"]),
            probe.task("d", ms(10)),
        ],
        2,
    ))
    .await;

    assert_eq!(
        report.counts(),
        StatusCounts {
            success: 1,
            error: 3,
            skipped: 0
        }
    );
    assert!(!report.all_passed());

    let a = report.task("a").unwrap();
    assert_eq!(a.error, Some(TaskFailure::Body("exit status 3".to_string())));
    assert!(a.start.is_some() && a.duration.is_some());

    let b = report.task("b").unwrap();
    assert_eq!(
        b.error,
        Some(TaskFailure::DependencyFailed {
            dependency: "a".to_string()
        })
    );
    assert!(b.start.is_none());
    assert_eq!(
        report.task("c").unwrap().error,
        Some(TaskFailure::DependencyFailed {
            dependency: "b".to_string()
        })
    );

    assert!(!probe.ran("b"));
    assert!(!probe.ran("c"));
    assert!(probe.ran("d"));
}

#[tokio::test]
async fn panicking_body_is_a_task_error() {
    init_tracing();
    let probe = Probe::new();
    let report = with_timeout(run_local(
        vec![
            TaskDescriptor::new("boom", || async {
                if true {
                    panic!("kaboom");
                }
                anyhow::Ok(())
            }),
            probe.task("after-boom", ms(1)).after(["boom"]),
            probe.task("bystander", ms(1)),
        ],
        2,
    ))
    .await;

    match &report.task("boom").unwrap().error {
        Some(TaskFailure::Panicked(msg)) => assert!(msg.contains("kaboom"), "got {msg}"),
        other => panic!("expected a panic failure, got {other:?}"),
    }
    assert_eq!(report.status_of("after-boom"), Some(TaskStatus::Error));
    assert_eq!(report.status_of("bystander"), Some(TaskStatus::Success));
    assert!(!probe.ran("after-boom"));
}

#[tokio::test]
async fn skips_spread_and_predicates_see_earlier_results() {
    init_tracing();
    let probe = Probe::new();
    let gate_opened = Arc::new(AtomicBool::new(false));

    let flag = gate_opened.clone();
    let gate = TaskDescriptor::new("gate", move || {
        let flag = flag.clone();
        async move {
            flag.store(true, Ordering::SeqCst);
            anyhow::Ok(())
        }
    });
    let flag = gate_opened.clone();

    let report = with_timeout(run_local(
        vec![
            gate,
            probe
                .task("only-if-closed", ms(1))
                .after(["gate"])
                .skip(move || flag.load(Ordering::SeqCst)),
            probe.task("downstream", ms(1)).after(["only-if-closed"]),
            probe.task("off", ms(1)).skip_if(true),
        ],
        0,
    ))
    .await;

    assert_eq!(report.status_of("gate"), Some(TaskStatus::Success));
    assert_eq!(report.status_of("only-if-closed"), Some(TaskStatus::Skipped));
    assert_eq!(report.status_of("downstream"), Some(TaskStatus::Skipped));
    assert_eq!(report.status_of("off"), Some(TaskStatus::Skipped));
    assert!(report.all_passed());
    assert!(probe.started().is_empty());
    assert!(report.task("off").unwrap().duration.is_none());
}

#[tokio::test]
async fn released_resource_goes_to_the_next_waiter() {
    init_tracing();
    let probe = Probe::new();
    let report = with_timeout(run_local(
        vec![
            probe.task("t1", ms(30)).resources(["r"]),
            probe.task("t2", ms(30)).resources(["r"]),
        ],
        2,
    ))
    .await;

    assert!(report.all_passed());
    assert_eq!(probe.started(), vec!["t1", "t2"]);
    assert!(probe.finished_before("t1", "t2"));
}

fn held_elsewhere() -> LockOutcome {
    LockOutcome::Conflict(LeaseConflict {
        first_resource: "db".to_string(),
        holder: "client-other".to_string(),
        expire_in: Duration::from_secs(5),
    })
}

/// Run one `db` task of `work` length against a lock client that refuses
/// `conflicts` times before granting.
async fn run_contended(
    concurrency: usize,
    conflicts: usize,
    work: Duration,
) -> (RunReport, Arc<ScriptedLockClient>) {
    let mut client = ScriptedLockClient::new("me");
    for _ in 0..conflicts {
        client = client.then(held_elsewhere());
    }
    let client = Arc::new(client);
    let probe = Probe::new();
    let suite = resolve(vec![probe.task("migrate", work).resources(["db"])]).unwrap();

    let report = Runner::new(
        suite,
        LockingCoordinator::new(LockingOptions::default()).with_external(client.clone()),
        RunnerOptions {
            concurrency,
            fail_fast: false,
        },
    )
    .run()
    .await;
    (report, client)
}

#[tokio::test(start_paused = true)]
async fn sequential_mode_waits_out_external_conflicts() {
    init_tracing();
    let (report, client) = run_contended(0, 2, ms(10)).await;

    assert_eq!(report.status_of("migrate"), Some(TaskStatus::Success));
    assert_eq!(client.acquire_calls(), 3);
    assert_eq!(client.released(), vec![vec!["db".to_string()]]);
}

#[tokio::test(start_paused = true)]
async fn duration_excludes_lock_wait() {
    init_tracing();
    // 50ms + 100ms + 200ms of backoff before the 100ms body may start.
    for concurrency in [0, 2] {
        let (report, client) = run_contended(concurrency, 3, ms(100)).await;
        assert_eq!(client.acquire_calls(), 4);

        let migrate = report.task("migrate").unwrap();
        let duration = migrate.duration.expect("a task that ran has a duration");
        assert!(
            duration >= ms(100) && duration < ms(150),
            "concurrency {concurrency}: duration {duration:?} includes lock wait"
        );
        assert!(migrate.start.is_some());
    }
}

#[tokio::test(start_paused = true)]
async fn externally_held_resource_is_retried_until_granted() {
    init_tracing();
    let conflict = LockOutcome::Conflict(LeaseConflict {
        first_resource: "db".to_string(),
        holder: "client-other".to_string(),
        expire_in: Duration::from_secs(5),
    });
    let client = Arc::new(
        ScriptedLockClient::new("me")
            .then(conflict.clone())
            .then(conflict),
    );
    let runs = Arc::new(AtomicUsize::new(0));
    let counter = runs.clone();

    let suite = resolve(vec![TaskDescriptor::new("migrate", move || {
        let counter = counter.clone();
        async move {
            counter.fetch_add(1, Ordering::SeqCst);
            anyhow::Ok(())
        }
    })
    .resources(["db"])])
    .unwrap();

    let report = Runner::new(
        suite,
        LockingCoordinator::new(LockingOptions::default()).with_external(client.clone()),
        RunnerOptions {
            concurrency: 2,
            fail_fast: false,
        },
    )
    .run()
    .await;

    assert!(report.all_passed());
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(client.acquire_calls(), 3);
    assert_eq!(client.released(), vec![vec!["db".to_string()]]);
}

#[tokio::test(start_paused = true)]
async fn leases_are_renewed_while_the_task_runs() {
    init_tracing();
    let client = Arc::new(ScriptedLockClient::new("me"));
    let probe = Probe::new();
    let suite = resolve(vec![probe.task("long", ms(450)).resources(["db"])]).unwrap();

    let options = LockingOptions {
        lease: ms(200),
        ..LockingOptions::default()
    };
    let report = Runner::new(
        suite,
        LockingCoordinator::new(options).with_external(client.clone()),
        RunnerOptions {
            concurrency: 1,
            fail_fast: false,
        },
    )
    .run()
    .await;

    assert!(report.all_passed());
    // initial acquire plus a renewal every 100ms
    assert!(client.acquire_calls() >= 4, "calls: {}", client.acquire_calls());
}
