// src/lock/protocol.rs

//! JSON bodies of the lease protocol.
//!
//! ```text
//! POST   <url>  {resources, expireIn, client}  -> 200 | 409 Conflict | 400
//! DELETE <url>  {resources, client}            -> 200 | 409 Conflict | 400
//! GET    <url>                                 -> 200 [LeaseRecord]
//! ```
//!
//! Durations are remaining lifetimes in milliseconds, never timestamps, so
//! client and service clocks do not need to agree.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Longest lease the service grants.
pub const MAX_LEASE: Duration = Duration::from_millis(60_000);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcquireRequest {
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire_in: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseRequest {
    pub resources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client: Option<String>,
}

/// 409 body: the first requested resource that someone else holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictBody {
    pub first_resource: String,
    pub client: String,
    pub expire_in: u64,
}

/// One held lock as reported by `GET`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseRecord {
    pub resource: String,
    pub client: String,
    pub expire_in: u64,
}

/// 400 body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
