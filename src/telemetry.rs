//! Telemetry metric name constants.
//!
//! Centralised metric names for datagate. Consumers install their own
//! `metrics` recorder (e.g. prometheus, statsd); without a recorder
//! installed, all metric calls are no-ops.
//!
//! # Metric naming conventions
//!
//! All metrics are prefixed with `datagate_`. Counters end in `_total`,
//! histograms use meaningful units (e.g. `_seconds`).
//!
//! # Common labels
//!
//! - `operation`: operation identifier (e.g. "stock_zh_a_hist")
//! - `outcome`: "ok", "empty", "unknown_operation", "invalid_parameters",
//!   "provider_failure"
//! - `cache`: cache status: "HIT", "MISS", "DISABLED"
//! - `status`: outbound HTTP status class: "ok" or "error"

/// Total invocations handled by the gateway, including cache hits.
///
/// Labels: `operation`, `outcome`, `cache`.
pub const INVOCATIONS_TOTAL: &str = "datagate_invocations_total";

/// End-to-end invocation duration in seconds, admission wait included.
///
/// Labels: `operation`.
pub const INVOCATION_DURATION_SECONDS: &str = "datagate_invocation_duration_seconds";

/// Total number of admissions that had to wait for the window to free up.
pub const ADMISSION_WAITS_TOTAL: &str = "datagate_admission_waits_total";

/// Time spent waiting for admission, in seconds.
pub const ADMISSION_WAIT_SECONDS: &str = "datagate_admission_wait_seconds";

/// Total outbound requests dispatched through the request shaper.
///
/// Labels: `status` ("ok" | "error").
pub const OUTBOUND_REQUESTS_TOTAL: &str = "datagate_outbound_requests_total";
