// src/lib.rs

pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod lock;
pub mod lockservice;
pub mod logging;
pub mod task;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::cli::{CliArgs, Command, LocksArgs, RunArgs};
use crate::config::{RawSuiteFile, SuiteFile, load_from_path};
use crate::dag::{ResolvedSuite, resolve};
use crate::engine::{RunReport, Runner, StatusLine};
use crate::lock::{HttpLockClient, LeaseRecord, LockClient, LockingCoordinator};

/// High-level entry point used by `main.rs`.
///
/// Returns `Ok(false)` when the command ran but the outcome should make the
/// process exit non-zero (a task ended in error).
pub async fn run(args: CliArgs) -> Result<bool> {
    match args.command {
        Command::Run(run) => run_suite(run).await,
        Command::Locks(locks) => {
            list_locks(locks).await?;
            Ok(true)
        }
        Command::ServeLocks(serve) => {
            lockservice::serve(serve.listen).await?;
            Ok(true)
        }
    }
}

async fn run_suite(args: RunArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let mut raw = load_from_path(&config_path)
        .with_context(|| format!("reading suite file {}", config_path.display()))?;
    apply_overrides(&mut raw, &args);
    let suite_file = SuiteFile::try_from(raw)
        .with_context(|| format!("validating suite file {}", config_path.display()))?;

    let workdir = config_root_dir(&config_path);
    let suite = resolve(suite_file.descriptors(&workdir))?;

    if args.dry_run {
        print_dry_run(&suite_file, &suite);
        return Ok(true);
    }

    let mut coordinator = LockingCoordinator::new(suite_file.locking_options());
    if let Some(url) = suite_file.locking.url.as_ref().filter(|_| suite_file.locking.enabled) {
        let client_id = suite_file.client_id();
        let timeout = suite_file.locking_options().request_timeout();
        info!(%url, client = %client_id, ?timeout, "coordinating resources through lock service");
        coordinator = coordinator.with_external(Arc::new(HttpLockClient::with_timeout(
            url, client_id, timeout,
        )));
    }

    let report = Runner::new(suite, coordinator, suite_file.runner_options())
        .with_observer(StatusLine)
        .run()
        .await;

    print_summary(&report);
    Ok(report.all_passed())
}

/// CLI flags win over the suite file.
fn apply_overrides(raw: &mut RawSuiteFile, args: &RunArgs) {
    if let Some(concurrency) = args.concurrency {
        raw.config.concurrency = concurrency;
    }
    if args.fail_fast {
        raw.config.fail_fast = true;
    }
    if let Some(url) = &args.lock_url {
        raw.locking.url = Some(url.clone());
    }
    if let Some(client) = &args.client {
        raw.locking.client = Some(client.clone());
    }
    if args.no_locking {
        raw.locking.enabled = false;
    }
}

async fn list_locks(args: LocksArgs) -> Result<()> {
    let client = HttpLockClient::new(&args.lock_url, "suiterun-cli");
    let leases = client
        .list()
        .await
        .with_context(|| format!("listing locks at {}", client.url()))?;

    if leases.is_empty() {
        println!("no locks held");
        return Ok(());
    }

    println!("{:<24} {:<32} {:>10}", "RESOURCE", "CLIENT", "EXPIRES");
    for lease in &leases {
        println!("{}", lease_row(lease));
    }
    Ok(())
}

/// Remaining lifetime is rounded up so a live lease never shows `0s`.
fn lease_row(lease: &LeaseRecord) -> String {
    format!(
        "{:<24} {:<32} {:>9}s",
        lease.resource,
        lease.client,
        lease.expire_in.div_ceil(1000)
    )
}

/// Directory task commands run in.
///
/// - If the config path has a non-empty parent (e.g. "ci/Suite.toml"),
///   we use that directory.
/// - If it's just a bare filename like "Suite.toml" (parent = ""),
///   we fall back to the current working directory "."
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
    }
}

fn print_dry_run(cfg: &SuiteFile, suite: &ResolvedSuite) {
    println!("suiterun dry-run");
    println!("  config.concurrency = {}", cfg.config.concurrency);
    println!("  config.fail_fast = {}", cfg.config.fail_fast);
    match (&cfg.locking.url, cfg.locking.enabled) {
        (_, false) => println!("  locking = disabled"),
        (Some(url), true) => println!("  locking = {url} (lease {}ms)", cfg.locking.lease_ms),
        (None, true) => println!("  locking = in-process only"),
    }
    println!();

    println!("tasks in causal order ({}):", suite.len());
    for index in suite.topological_order() {
        let task = &suite.tasks()[index];
        println!("  - {}", task.id());
        if task.name() != task.id() {
            println!("      name: {}", task.name());
        }
        if let Some(entry) = cfg.task.iter().find(|t| t.id == task.id()) {
            println!("      cmd: {}", entry.cmd);
            if entry.skip {
                println!("      skip: true");
            }
        }
        if !task.dependencies().is_empty() {
            let after: Vec<&str> = task
                .dependencies()
                .iter()
                .map(|&d| suite.tasks()[d].id())
                .collect();
            println!("      after: {after:?}");
        }
        if !task.resources().is_empty() {
            let resources: Vec<&str> = task.resources().iter().map(|r| r.as_str()).collect();
            println!("      resources: {resources:?}");
        }
        let dependents: Vec<&str> = suite
            .dependents_of(index)
            .into_iter()
            .map(|d| suite.tasks()[d].id())
            .collect();
        if !dependents.is_empty() {
            println!("      unblocks: {dependents:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_summary(report: &RunReport) {
    let counts = report.counts();
    println!();
    println!(
        "{} passed, {} failed, {} skipped",
        counts.success, counts.error, counts.skipped
    );
}
