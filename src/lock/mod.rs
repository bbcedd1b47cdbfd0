// src/lock/mod.rs

//! Resource locking.
//!
//! - [`ledger`] is the in-process set of held resources.
//! - [`client`] speaks the lease protocol ([`protocol`]) to a remote lock
//!   service shared by cooperating processes.
//! - [`coordinator`] combines both behind the all-or-nothing
//!   acquire / release API the runner uses.
//! - [`backoff`] is the retry delay sequence for blocking acquisition.

pub mod backoff;
pub mod client;
pub mod coordinator;
pub mod ledger;
pub mod protocol;

pub use backoff::Backoff;
pub use client::{
    DEFAULT_REQUEST_TIMEOUT, HttpLockClient, LeaseConflict, LockClient, LockClientError, LockFuture, LockOutcome,
    default_client_id,
};
pub use coordinator::{DEFAULT_LEASE, LockingCoordinator, LockingOptions};
pub use ledger::LockLedger;
pub use protocol::{LeaseRecord, MAX_LEASE};
