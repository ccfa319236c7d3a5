//! Tests for metrics integration.
//!
//! Uses `metrics_util::debugging::DebuggingRecorder` to capture and assert
//! on emitted metrics without needing a real exporter.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use metrics_util::MetricKind;
use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

use datagate::{
    Arguments, Datagate, GatewayError, InvocationGateway, Operation, OperationRegistry,
    ParameterSet, Result, ShapedClient, ShaperConfig, Table, telemetry,
};

// ============================================================================
// Mock operations
// ============================================================================

struct OkOperation;

#[async_trait]
impl Operation for OkOperation {
    async fn call(&self, _args: &Arguments, _http: &ShapedClient) -> Result<Option<Table>> {
        Ok(Some(Table::new(["a"])))
    }
}

struct FailingOperation;

#[async_trait]
impl Operation for FailingOperation {
    async fn call(&self, _args: &Arguments, _http: &ShapedClient) -> Result<Option<Table>> {
        Err(GatewayError::Http("reset".into()))
    }
}

// ============================================================================
// Snapshot type alias for readability
// ============================================================================

type SnapshotVec = Vec<(
    metrics_util::CompositeKey,
    Option<metrics::Unit>,
    Option<metrics::SharedString>,
    DebugValue,
)>;

// ============================================================================
// Helpers
// ============================================================================

/// Sum all counter values matching a given metric name.
fn counter_total(snapshot: &SnapshotVec, name: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| key.kind() == MetricKind::Counter && key.key().name() == name)
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Sum counter values for `name` whose labels include `label = value`.
fn counter_with_label(snapshot: &SnapshotVec, name: &str, label: &str, value: &str) -> u64 {
    snapshot
        .iter()
        .filter(|(key, _, _, _)| {
            key.kind() == MetricKind::Counter
                && key.key().name() == name
                && key
                    .key()
                    .labels()
                    .any(|l| l.key() == label && l.value() == value)
        })
        .map(|(_, _, _, value)| match value {
            DebugValue::Counter(v) => *v,
            _ => 0,
        })
        .sum()
}

/// Check if any histogram entries exist for a given metric name.
fn has_histogram(snapshot: &SnapshotVec, name: &str) -> bool {
    snapshot
        .iter()
        .any(|(key, _, _, _)| key.kind() == MetricKind::Histogram && key.key().name() == name)
}

fn gateway() -> InvocationGateway {
    let registry = OperationRegistry::new("test")
        .with("ok", OkOperation)
        .with("failing", FailingOperation);
    Datagate::builder()
        .provider(registry)
        .no_random_delay()
        .admission_jitter(Duration::ZERO, Duration::ZERO)
        .build()
        .unwrap()
}

// ============================================================================
// Tests
// ============================================================================

/// Runs async code within a local recorder scope on the multi-thread runtime.
///
/// `block_in_place` ensures the sync `with_local_recorder` closure stays
/// on the current thread while `block_on` drives the inner async work.
#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn invocations_record_outcome_and_cache_labels() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let gateway = gateway();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                let params = ParameterSet::new();
                gateway.invoke("ok", &params).await;
                gateway.invoke("ok", &params).await;
                gateway.invoke("failing", &params).await;
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let name = telemetry::INVOCATIONS_TOTAL;

    assert_eq!(counter_total(&snapshot, name), 3);
    assert_eq!(counter_with_label(&snapshot, name, "cache", "HIT"), 1);
    assert_eq!(counter_with_label(&snapshot, name, "cache", "MISS"), 2);
    assert_eq!(counter_with_label(&snapshot, name, "outcome", "ok"), 2);
    assert_eq!(
        counter_with_label(&snapshot, name, "outcome", "provider_failure"),
        1
    );
    assert!(
        has_histogram(&snapshot, telemetry::INVOCATION_DURATION_SECONDS),
        "expected a duration histogram entry"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn unknown_operations_share_one_label() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let gateway = gateway();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                gateway.invoke("random_a", &ParameterSet::new()).await;
                gateway.invoke("random_b", &ParameterSet::new()).await;
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(
        counter_with_label(
            &snapshot,
            telemetry::INVOCATIONS_TOTAL,
            "operation",
            "_unknown"
        ),
        2
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn admission_waits_are_recorded() {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    let gateway = Datagate::builder()
        .provider(OperationRegistry::new("test").with("ok", OkOperation))
        .rate_limit(1, Duration::from_millis(50))
        .admission_jitter(Duration::ZERO, Duration::ZERO)
        .disable_cache()
        .no_random_delay()
        .build()
        .unwrap();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                gateway.invoke("ok", &ParameterSet::new()).await;
                gateway.invoke("ok", &ParameterSet::new()).await;
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    assert_eq!(counter_total(&snapshot, telemetry::ADMISSION_WAITS_TOTAL), 1);
    assert!(has_histogram(&snapshot, telemetry::ADMISSION_WAIT_SECONDS));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 1)]
async fn outbound_requests_are_counted() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    let client = Arc::new(ShapedClient::new(ShaperConfig::new().no_random_delay()).unwrap());

    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();

    metrics::with_local_recorder(&recorder, || {
        tokio::task::block_in_place(|| {
            tokio::runtime::Handle::current().block_on(async {
                client.get(server.uri()).send().await.unwrap();
                let _ = client.get("http://127.0.0.1:1/").send().await;
            })
        })
    });

    let snapshot = snapshotter.snapshot().into_vec();
    let name = telemetry::OUTBOUND_REQUESTS_TOTAL;
    assert_eq!(counter_with_label(&snapshot, name, "status", "ok"), 1);
    assert_eq!(counter_with_label(&snapshot, name, "status", "error"), 1);
}

#[tokio::test]
async fn metrics_are_noop_without_recorder() {
    // Verify no panics when no recorder is installed.
    let invocation = gateway().invoke("ok", &ParameterSet::new()).await;
    assert!(invocation.is_success());
}
