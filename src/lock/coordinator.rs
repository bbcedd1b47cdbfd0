// src/lock/coordinator.rs

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::lock::backoff::Backoff;
use crate::lock::client::{LockClient, LockOutcome};
use crate::lock::ledger::LockLedger;
use crate::lock::protocol::millis;
use crate::task::Task;

/// Lease requested from the external service for every acquisition.
pub const DEFAULT_LEASE: Duration = Duration::from_secs(40);

#[derive(Debug, Clone)]
pub struct LockingOptions {
    /// When false every acquire succeeds immediately and nothing is tracked.
    pub enabled: bool,
    pub lease: Duration,
    /// Re-request held leases every `lease / 2` while their task runs.
    pub renew: bool,
}

impl LockingOptions {
    /// Deadline for one lock service request: a quarter of the lease, at
    /// least 100ms. Stays below the `lease / 2` renewal period.
    pub fn request_timeout(&self) -> Duration {
        (self.lease / 4).max(MIN_REQUEST_TIMEOUT)
    }
}

const MIN_REQUEST_TIMEOUT: Duration = Duration::from_millis(100);

impl Default for LockingOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            lease: DEFAULT_LEASE,
            renew: true,
        }
    }
}

/// Single entry point for resource exclusivity during one run.
///
/// Local contention is answered from the [`LockLedger`] without a network
/// round trip; only when the ledger is clear is the external service (if
/// any) asked. A task gets all of its resources or none of them.
///
/// Built once per run and consumed by [`shutdown`](Self::shutdown), which
/// checks that nothing is left held.
pub struct LockingCoordinator {
    options: LockingOptions,
    ledger: LockLedger,
    external: Option<Arc<dyn LockClient>>,
}

impl LockingCoordinator {
    pub fn new(options: LockingOptions) -> Self {
        Self {
            options,
            ledger: LockLedger::new(),
            external: None,
        }
    }

    /// Also coordinate through a remote lock service.
    pub fn with_external(mut self, client: Arc<dyn LockClient>) -> Self {
        self.external = Some(client);
        self
    }

    pub fn ledger(&self) -> &LockLedger {
        &self.ledger
    }

    pub fn has_external(&self) -> bool {
        self.external.is_some()
    }

    /// How often running tasks' leases should be renewed, if at all.
    pub fn renew_interval(&self) -> Option<Duration> {
        (self.options.enabled && self.options.renew && self.external.is_some())
            .then(|| self.options.lease / 2)
            .filter(|d| !d.is_zero())
    }

    /// Try once to take every resource `task` declares.
    ///
    /// Returns `false` when any of them is held in this process, when the
    /// external service reports a conflict, or when the service cannot be
    /// reached. Nothing is recorded unless the answer is `true`.
    pub async fn acquire(&mut self, task: &Task) -> bool {
        if !self.options.enabled || task.resources().is_empty() {
            return true;
        }

        debug!(task = %task.id(), resources = ?task.resources(), "attempting resource lock");

        if let Some(held) = self.ledger.first_held(task.resources()) {
            debug!(
                task = %task.id(),
                resource = %held,
                holder = self.ledger.holder_of(held).unwrap_or_default(),
                "resource held in this process"
            );
            return false;
        }

        if let Some(client) = &self.external {
            match client.acquire(task.resources(), self.options.lease).await {
                Ok(LockOutcome::Granted) => {}
                Ok(LockOutcome::Conflict(conflict)) => {
                    debug!(
                        task = %task.id(),
                        resource = %conflict.first_resource,
                        holder = %conflict.holder,
                        expire_in_ms = millis(conflict.expire_in),
                        "resource held by another lock client"
                    );
                    return false;
                }
                Err(err) => {
                    warn!(task = %task.id(), error = %err, "lock service unavailable; will retry");
                    return false;
                }
            }
        }

        self.ledger.insert_all(task.id(), task.resources());
        debug!(task = %task.id(), resources = ?task.resources(), "resources locked");
        true
    }

    /// Keep calling [`acquire`](Self::acquire) until it succeeds, sleeping
    /// 50ms, 100ms, 200ms, ... (capped at 10s) between attempts.
    ///
    /// There is no attempt limit: a resource that never frees up blocks the
    /// task forever, like an unfinished dependency would.
    pub async fn acquire_eventually(&mut self, task: &Task) {
        let mut backoff = Backoff::new();
        while !self.acquire(task).await {
            let delay = backoff.next_delay();
            debug!(task = %task.id(), delay_ms = millis(delay), "resources busy; backing off");
            tokio::time::sleep(delay).await;
        }
    }

    /// Give back everything `task` acquired.
    ///
    /// A failing external release is only logged; the remote lease expires
    /// on its own. The local ledger is always cleared.
    pub async fn release(&mut self, task: &Task) {
        if !self.options.enabled || task.resources().is_empty() {
            return;
        }

        if let Some(client) = &self.external {
            match client.release(task.resources()).await {
                Ok(LockOutcome::Granted) => {}
                Ok(LockOutcome::Conflict(conflict)) => warn!(
                    task = %task.id(),
                    resource = %conflict.first_resource,
                    holder = %conflict.holder,
                    "lease was taken over before release"
                ),
                Err(err) => warn!(
                    task = %task.id(),
                    error = %err,
                    "failed to release external lease; it will expire on its own"
                ),
            }
        }

        self.ledger.remove_all(task.id(), task.resources());
        debug!(task = %task.id(), resources = ?task.resources(), "resources released");
    }

    /// Extend the external lease of a running task.
    pub async fn renew(&self, task: &Task) {
        let Some(client) = &self.external else {
            return;
        };
        if !self.options.enabled || task.resources().is_empty() {
            return;
        }

        match client.acquire(task.resources(), self.options.lease).await {
            Ok(LockOutcome::Granted) => {
                debug!(task = %task.id(), "lease renewed");
            }
            Ok(LockOutcome::Conflict(conflict)) => warn!(
                task = %task.id(),
                resource = %conflict.first_resource,
                holder = %conflict.holder,
                "lease renewal refused; another client holds the resource"
            ),
            Err(err) => warn!(task = %task.id(), error = %err, "lease renewal failed"),
        }
    }

    /// End of run. Panics if any resource is still held.
    pub fn shutdown(self) {
        assert!(
            self.ledger.is_empty(),
            "lock ledger not empty at end of run: {:?}",
            self.ledger
        );
        info!("locking coordinator shut down");
    }
}
