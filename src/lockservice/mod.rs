// src/lockservice/mod.rs

//! Reference lock service.
//!
//! Serves the lease protocol from [`crate::lock::protocol`] on `/locks` over
//! an in-memory [`LeaseTable`]. Leases of a crashed client simply run out,
//! which is the only way a stuck lock ever clears.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::routing::post;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::errors::Result;

mod handlers;
pub mod table;

pub use table::LeaseTable;

/// Path the protocol is mounted on.
pub const LOCKS_PATH: &str = "/locks";

/// Create the HTTP router with a fresh lease table.
pub fn router() -> Router {
    let table: handlers::SharedTable = Arc::new(Mutex::new(LeaseTable::new()));
    Router::new()
        .route(
            LOCKS_PATH,
            post(handlers::acquire)
                .delete(handlers::release)
                .get(handlers::list),
        )
        .with_state(table)
}

/// Serve on an already bound listener until the process stops.
pub async fn serve_on(listener: TcpListener) -> Result<()> {
    let addr = listener.local_addr()?;
    info!(%addr, path = LOCKS_PATH, "lock service listening");
    axum::serve(listener, router()).await?;
    Ok(())
}

/// Bind `addr` and serve until Ctrl-C.
pub async fn serve(addr: SocketAddr) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    let local = listener.local_addr()?;
    info!(addr = %local, path = LOCKS_PATH, "lock service listening");
    axum::serve(listener, router())
        .with_graceful_shutdown(until_signal(tokio::signal::ctrl_c()))
        .await?;
    Ok(())
}

/// Resolves when `signal` fires. If the handler could not be installed the
/// service keeps running instead of stopping straight away.
async fn until_signal<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("lock service shutting down"),
        Err(e) => {
            warn!(error = %e, "cannot listen for Ctrl-C; serving until killed");
            std::future::pending::<()>().await;
        }
    }
}
