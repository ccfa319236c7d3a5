//! HTTP surface.
//!
//! Serves any [`Gateway`](crate::Gateway) over HTTP:
//!
//! - `GET /api/public/{operation}?<params>` invokes an operation. The body
//!   is the JSON payload; every gateway response carries `X-Cache-Status`.
//! - `GET /api/operations` lists the current capability set.
//! - `GET /health` reports liveness and the package version.
//!
//! Not-found outcomes (unknown operation, no data, bad parameters) map to
//! 404, provider failures to 500 and an elapsed request deadline to 504.

pub mod config;
mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::get;

use crate::Gateway;

pub use routes::CACHE_STATUS_HEADER;

/// Shared handler state.
pub struct AppState<G: Gateway> {
    pub gateway: Arc<G>,
    /// Deadline for one invocation, admission wait included.
    pub request_timeout: Duration,
}

/// Build the router for `gateway`.
pub fn router<G: Gateway + 'static>(gateway: Arc<G>, request_timeout: Duration) -> Router {
    let state = Arc::new(AppState {
        gateway,
        request_timeout,
    });

    Router::new()
        .route("/api/public/{operation}", get(routes::invoke::<G>))
        .route("/api/operations", get(routes::operations::<G>))
        .route("/health", get(routes::health))
        .layer(axum::Extension(state))
}
