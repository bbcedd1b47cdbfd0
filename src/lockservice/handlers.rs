// src/lockservice/handlers.rs

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::debug;

use crate::lock::protocol::{AcquireRequest, ErrorBody, LeaseRecord, MAX_LEASE, ReleaseRequest, millis};
use crate::lockservice::table::LeaseTable;

pub type SharedTable = Arc<Mutex<LeaseTable>>;

fn lock(table: &SharedTable) -> MutexGuard<'_, LeaseTable> {
    table.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn bad_request(message: impl Into<String>) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

fn required_client(client: Option<String>) -> Result<String, Response> {
    match client {
        Some(c) if !c.is_empty() => Ok(c),
        _ => Err(bad_request("missing `client`")),
    }
}

pub async fn acquire(State(table): State<SharedTable>, Json(req): Json<AcquireRequest>) -> Response {
    let client = match required_client(req.client) {
        Ok(c) => c,
        Err(resp) => return resp,
    };
    let expire_in = match req.expire_in {
        Some(ms) if ms <= millis(MAX_LEASE) => Duration::from_millis(ms),
        Some(ms) => {
            return bad_request(format!(
                "`expireIn` {ms} exceeds the maximum of {}",
                millis(MAX_LEASE)
            ));
        }
        None => return bad_request("missing `expireIn`"),
    };

    let result = lock(&table).acquire(&client, &req.resources, expire_in, Instant::now());
    match result {
        Ok(()) => {
            debug!(%client, resources = ?req.resources, "lease granted");
            StatusCode::OK.into_response()
        }
        Err(conflict) => {
            debug!(%client, resource = %conflict.first_resource, holder = %conflict.client, "lease conflict");
            (StatusCode::CONFLICT, Json(conflict)).into_response()
        }
    }
}

pub async fn release(State(table): State<SharedTable>, Json(req): Json<ReleaseRequest>) -> Response {
    let client = match required_client(req.client) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    let result = lock(&table).release(&client, &req.resources, Instant::now());
    match result {
        Ok(()) => {
            debug!(%client, resources = ?req.resources, "lease released");
            StatusCode::OK.into_response()
        }
        Err(conflict) => (StatusCode::CONFLICT, Json(conflict)).into_response(),
    }
}

pub async fn list(State(table): State<SharedTable>) -> Json<Vec<LeaseRecord>> {
    Json(lock(&table).list(Instant::now()))
}
