// src/lock/client.rs

//! External lock client.
//!
//! A thin, retry-free client over the three lease operations. Conflicts are
//! ordinary [`LockOutcome`] values; only transport or protocol trouble is a
//! [`LockClientError`]. Retrying is the coordinator's job.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::Utc;
use reqwest::StatusCode;
use thiserror::Error;
use tracing::debug;

use crate::lock::protocol::{
    AcquireRequest, ConflictBody, LeaseRecord, ReleaseRequest, millis,
};
use crate::task::ResourceName;

/// Result of an acquire or release call that reached the service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LockOutcome {
    Granted,
    Conflict(LeaseConflict),
}

/// Someone else holds one of the requested resources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaseConflict {
    /// First resource from the request that was already held.
    pub first_resource: String,
    /// Client id of the current holder.
    pub holder: String,
    /// Remaining lifetime of the holder's lease.
    pub expire_in: Duration,
}

impl From<ConflictBody> for LeaseConflict {
    fn from(body: ConflictBody) -> Self {
        Self {
            first_resource: body.first_resource,
            holder: body.client,
            expire_in: Duration::from_millis(body.expire_in),
        }
    }
}

#[derive(Debug, Error)]
pub enum LockClientError {
    #[error("lock service request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("lock service answered HTTP {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("malformed lock service response: {0}")]
    Decode(String),
}

pub type LockFuture<'a, T> =
    Pin<Box<dyn Future<Output = Result<T, LockClientError>> + Send + 'a>>;

/// Abstraction over the remote lock service.
///
/// Production code uses [`HttpLockClient`]; tests can script outcomes.
pub trait LockClient: Send + Sync {
    /// Identity presented to the service; the basis of ownership checks.
    fn client_id(&self) -> &str;

    /// Acquire (or extend) a lease on every resource, all or nothing.
    fn acquire<'a>(
        &'a self,
        resources: &'a [ResourceName],
        lease: Duration,
    ) -> LockFuture<'a, LockOutcome>;

    fn release<'a>(&'a self, resources: &'a [ResourceName]) -> LockFuture<'a, LockOutcome>;

    /// Every lease the service currently knows about.
    fn list(&self) -> LockFuture<'_, Vec<LeaseRecord>>;
}

/// HTTP implementation of [`LockClient`].
#[derive(Debug, Clone)]
pub struct HttpLockClient {
    inner: reqwest::Client,
    url: String,
    client_id: String,
}

/// Per-request deadline used by [`HttpLockClient::new`].
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

impl HttpLockClient {
    pub fn new(url: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self::with_timeout(url, client_id, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Every request fails with [`LockClientError::Transport`] once
    /// `timeout` passes without a complete response.
    pub fn with_timeout(
        url: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            inner: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            url: url.into(),
            client_id: client_id.into(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn interpret(response: reqwest::Response) -> Result<LockOutcome, LockClientError> {
        match response.status() {
            status if status.is_success() => Ok(LockOutcome::Granted),
            StatusCode::CONFLICT => {
                let body: ConflictBody = response
                    .json()
                    .await
                    .map_err(|e| LockClientError::Decode(e.to_string()))?;
                Ok(LockOutcome::Conflict(body.into()))
            }
            status => Err(LockClientError::UnexpectedStatus {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            }),
        }
    }
}

fn resource_strings(resources: &[ResourceName]) -> Vec<String> {
    resources.iter().map(|r| r.as_str().to_string()).collect()
}

impl LockClient for HttpLockClient {
    fn client_id(&self) -> &str {
        &self.client_id
    }

    fn acquire<'a>(
        &'a self,
        resources: &'a [ResourceName],
        lease: Duration,
    ) -> LockFuture<'a, LockOutcome> {
        Box::pin(async move {
            let body = AcquireRequest {
                resources: resource_strings(resources),
                expire_in: Some(millis(lease)),
                client: Some(self.client_id.clone()),
            };
            debug!(url = %self.url, resources = ?body.resources, "POST lock request");
            let response = self.inner.post(&self.url).json(&body).send().await?;
            Self::interpret(response).await
        })
    }

    fn release<'a>(&'a self, resources: &'a [ResourceName]) -> LockFuture<'a, LockOutcome> {
        Box::pin(async move {
            let body = ReleaseRequest {
                resources: resource_strings(resources),
                client: Some(self.client_id.clone()),
            };
            debug!(url = %self.url, resources = ?body.resources, "DELETE lock request");
            let response = self.inner.delete(&self.url).json(&body).send().await?;
            Self::interpret(response).await
        })
    }

    fn list(&self) -> LockFuture<'_, Vec<LeaseRecord>> {
        Box::pin(async move {
            debug!(url = %self.url, "GET lock listing");
            let response = self.inner.get(&self.url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(LockClientError::UnexpectedStatus {
                    status: status.as_u16(),
                    body: response.text().await.unwrap_or_default(),
                });
            }
            response
                .json()
                .await
                .map_err(|e| LockClientError::Decode(e.to_string()))
        })
    }
}

/// Default client identity: `<user>-<unix millis>`.
pub fn default_client_id() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "suiterun".to_string());
    format!("{user}-{}", Utc::now().timestamp_millis())
}
