//! Request handlers.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Extension, Path, RawQuery};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use tracing::warn;

use super::AppState;
use crate::types::{CacheStatus, ParameterSet};
use crate::{Gateway, GatewayError};

/// Response header naming how the cache participated.
pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

/// GET /api/public/{operation} - Invoke an operation.
#[tracing::instrument(skip(state, query))]
pub(super) async fn invoke<G: Gateway + 'static>(
    Extension(state): Extension<Arc<AppState<G>>>,
    Path(operation): Path<String>,
    RawQuery(query): RawQuery,
) -> Response {
    let params = query
        .as_deref()
        .map(ParameterSet::from_query)
        .unwrap_or_default();

    let invocation = match tokio::time::timeout(
        state.request_timeout,
        state.gateway.invoke(&operation, &params),
    )
    .await
    {
        Ok(invocation) => invocation,
        Err(_) => {
            warn!(timeout_secs = state.request_timeout.as_secs(), "invocation deadline elapsed");
            return error_body(
                StatusCode::GATEWAY_TIMEOUT,
                &format!("operation {operation} timed out"),
            );
        }
    };

    let mut response = match invocation.result {
        Ok(payload) => (
            [(header::CONTENT_TYPE, "application/json")],
            payload.as_str().to_owned(),
        )
            .into_response(),
        Err(e) => error_response(&e),
    };
    response
        .headers_mut()
        .insert(CACHE_STATUS_HEADER, cache_header(invocation.cache_status));
    response
}

/// GET /api/operations - List available operations.
pub(super) async fn operations<G: Gateway + 'static>(
    Extension(state): Extension<Arc<AppState<G>>>,
) -> Json<serde_json::Value> {
    Json(json!({ "operations": state.gateway.operations() }))
}

/// GET /health - Liveness probe.
pub(super) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": crate::PKG_VERSION }))
}

fn error_response(err: &GatewayError) -> Response {
    let status = if err.is_not_found() {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    };
    error_body(status, &err.to_string())
}

fn error_body(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

fn cache_header(status: CacheStatus) -> HeaderValue {
    HeaderValue::from_static(status.as_str())
}
