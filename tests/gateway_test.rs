//! Tests for [`InvocationGateway`]: resolution, caching, admission and
//! outcome classification.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use datagate::{
    Arguments, CacheConfig, CacheStatus, Datagate, GatewayConfig, GatewayError,
    InvocationGateway, Operation, OperationRegistry, ParameterSet, Result, ShapedClient, Table,
};

// ============================================================================
// Mock operations
// ============================================================================

/// Echoes its arguments back as a one-row table and counts calls.
#[derive(Default)]
struct EchoOperation {
    calls: Arc<AtomicUsize>,
    delay: Option<Duration>,
}

#[async_trait]
impl Operation for EchoOperation {
    async fn call(&self, args: &Arguments, _http: &ShapedClient) -> Result<Option<Table>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let mut table = Table::new(args.iter().map(|(name, _)| name.to_string()));
        table.push_row(args.iter().map(|(_, value)| value.into()).collect())?;
        Ok(Some(table))
    }

    fn description(&self) -> &str {
        "echo"
    }
}

/// Always fails with a fixed error.
struct FailingOperation {
    error: GatewayError,
    calls: Arc<AtomicUsize>,
}

impl FailingOperation {
    fn new(error: GatewayError) -> Self {
        Self {
            error,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }
}

#[async_trait]
impl Operation for FailingOperation {
    async fn call(&self, _args: &Arguments, _http: &ShapedClient) -> Result<Option<Table>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

/// Returns no data.
struct EmptyOperation {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl Operation for EmptyOperation {
    async fn call(&self, _args: &Arguments, _http: &ShapedClient) -> Result<Option<Table>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn gateway(registry: Arc<OperationRegistry>) -> InvocationGateway {
    Datagate::builder()
        .provider_arc(registry)
        .no_random_delay()
        .admission_jitter(Duration::ZERO, Duration::ZERO)
        .build()
        .unwrap()
}

fn echo_registry() -> (Arc<OperationRegistry>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(OperationRegistry::new("test"));
    registry.register(
        "echo",
        EchoOperation {
            calls: calls.clone(),
            delay: None,
        },
    );
    (registry, calls)
}

// ============================================================================
// Builder
// ============================================================================

#[test]
fn build_without_provider_fails() {
    let result = Datagate::builder().build();
    assert!(matches!(result, Err(GatewayError::NoProvider)));
}

#[test]
fn build_with_invalid_config_fails() {
    let config = GatewayConfig {
        rate_limit_window_seconds: 0,
        ..GatewayConfig::default()
    };
    let result = Datagate::builder()
        .provider(OperationRegistry::default())
        .config(&config)
        .build();
    assert!(matches!(result, Err(GatewayError::Configuration(_))));
}

#[test]
fn config_applies_cache_and_rate_limit() {
    let config = GatewayConfig {
        rate_limit_max_requests: 4,
        cache_enable: false,
        random_delay_enable: false,
        ..GatewayConfig::default()
    };
    let gateway = Datagate::builder()
        .provider(OperationRegistry::default())
        .config(&config)
        .build()
        .unwrap();
    assert!(!gateway.cache_enabled());
    assert!(!gateway.http().delays_requests());
    assert_eq!(gateway.limiter().max_requests(), 4);
    assert_eq!(gateway.remaining_admissions(), 4);
}

// ============================================================================
// Caching
// ============================================================================

#[tokio::test]
async fn repeated_invocation_is_served_from_cache() {
    let (registry, calls) = echo_registry();
    let gateway = gateway(registry);
    let params = ParameterSet::from_query("symbol=000001&period=daily");

    let first = gateway.invoke("echo", &params).await;
    let second = gateway.invoke("echo", &params).await;

    assert_eq!(first.cache_status, CacheStatus::Miss);
    assert_eq!(second.cache_status, CacheStatus::Hit);
    assert_eq!(first.result.unwrap(), second.result.unwrap());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn quoted_value_does_not_collide_with_separate_parameters() {
    let (registry, calls) = echo_registry();
    let gateway = gateway(registry);

    let split = gateway
        .invoke("echo", &ParameterSet::from_query("a=1&b=2"))
        .await;
    // One parameter whose value mimics the rendering of two.
    let spliced = gateway
        .invoke("echo", &ParameterSet::from_query("a=1%22,%20b=%222"))
        .await;

    assert_eq!(split.cache_status, CacheStatus::Miss);
    assert_eq!(spliced.cache_status, CacheStatus::Miss);
    assert_eq!(
        spliced.result.unwrap().as_str(),
        r#"[{"a":"1\", b=\"2"}]"#
    );
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cache_hit_consumes_no_admission() {
    let (registry, _) = echo_registry();
    let gateway = gateway(registry);
    let params = ParameterSet::new();

    gateway.invoke("echo", &params).await;
    let after_first = gateway.remaining_admissions();
    gateway.invoke("echo", &params).await;
    assert_eq!(gateway.remaining_admissions(), after_first);
}

#[tokio::test]
async fn blank_queries_share_the_no_parameter_entry() {
    let (registry, calls) = echo_registry();
    let gateway = gateway(registry);

    let first = gateway.invoke("echo", &ParameterSet::new()).await;
    let second = gateway
        .invoke("echo", &ParameterSet::from_query("?&&"))
        .await;

    assert_eq!(first.result.unwrap().as_str(), "[{}]");
    assert_eq!(second.cache_status, CacheStatus::Hit);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn disabled_cache_calls_provider_every_time() {
    let (registry, calls) = echo_registry();
    let gateway = Datagate::builder()
        .provider_arc(registry)
        .disable_cache()
        .no_random_delay()
        .build()
        .unwrap();
    let params = ParameterSet::from_query("symbol=1");

    let first = gateway.invoke("echo", &params).await;
    let second = gateway.invoke("echo", &params).await;

    assert_eq!(first.cache_status, CacheStatus::Disabled);
    assert_eq!(second.cache_status, CacheStatus::Disabled);
    assert!(second.is_success());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn cached_entry_expires() {
    let (registry, calls) = echo_registry();
    let gateway = Datagate::builder()
        .provider_arc(registry)
        .cache(CacheConfig::new().ttl(Duration::from_millis(50)))
        .no_random_delay()
        .admission_jitter(Duration::ZERO, Duration::ZERO)
        .build()
        .unwrap();
    let params = ParameterSet::new();

    gateway.invoke("echo", &params).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    let again = gateway.invoke("echo", &params).await;

    assert_eq!(again.cache_status, CacheStatus::Miss);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn concurrent_misses_share_one_provider_call() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(OperationRegistry::new("test"));
    registry.register(
        "slow",
        EchoOperation {
            calls: calls.clone(),
            delay: Some(Duration::from_millis(100)),
        },
    );
    let gateway = Arc::new(gateway(registry));

    let mut handles = Vec::new();
    for _ in 0..5 {
        let gateway = gateway.clone();
        handles.push(tokio::spawn(async move {
            gateway
                .invoke("slow", &ParameterSet::from_query("symbol=1"))
                .await
        }));
    }

    let mut statuses = Vec::new();
    for handle in handles {
        let invocation = handle.await.unwrap();
        assert!(invocation.is_success());
        statuses.push(invocation.cache_status);
    }

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(
        statuses.iter().filter(|s| **s == CacheStatus::Miss).count(),
        1
    );
    assert_eq!(
        statuses.iter().filter(|s| **s == CacheStatus::Hit).count(),
        4
    );
}

// ============================================================================
// Resolution
// ============================================================================

#[tokio::test]
async fn unknown_operation_is_reported_without_admission() {
    let (registry, calls) = echo_registry();
    let gateway = gateway(registry);
    let before = gateway.remaining_admissions();

    let invocation = gateway.invoke("no_such_op", &ParameterSet::new()).await;

    assert!(
        matches!(invocation.result, Err(GatewayError::UnknownOperation(ref op)) if op == "no_such_op")
    );
    assert_eq!(invocation.cache_status, CacheStatus::Miss);
    assert_eq!(gateway.remaining_admissions(), before);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn capability_set_is_read_on_every_call() {
    let registry = Arc::new(OperationRegistry::new("test"));
    let gateway = Datagate::builder()
        .provider_arc(registry.clone())
        .disable_cache()
        .no_random_delay()
        .build()
        .unwrap();
    let params = ParameterSet::new();

    assert!(gateway.invoke("late", &params).await.result.is_err());

    registry.register("late", EchoOperation::default());
    assert_eq!(gateway.operations(), vec!["late"]);
    assert!(gateway.invoke("late", &params).await.is_success());

    registry.unregister("late");
    let invocation = gateway.invoke("late", &params).await;
    assert!(matches!(
        invocation.result,
        Err(GatewayError::UnknownOperation(_))
    ));
}

#[tokio::test]
async fn removed_operation_is_served_from_cache_until_expiry() {
    let (registry, _) = echo_registry();
    let gateway = gateway(registry.clone());
    let params = ParameterSet::new();

    gateway.invoke("echo", &params).await;
    registry.unregister("echo");

    let invocation = gateway.invoke("echo", &params).await;
    assert_eq!(invocation.cache_status, CacheStatus::Hit);
    assert!(invocation.is_success());
}

// ============================================================================
// Arguments
// ============================================================================

#[tokio::test]
async fn parameters_arrive_as_named_string_arguments() {
    let (registry, _) = echo_registry();
    let gateway = gateway(registry);

    let invocation = gateway
        .invoke(
            "echo",
            &ParameterSet::from_query("symbol=000001&start_date=20240101"),
        )
        .await;

    assert_eq!(
        invocation.result.unwrap().as_str(),
        r#"[{"symbol":"000001","start_date":"20240101"}]"#
    );
}

#[tokio::test]
async fn cookie_query_is_one_opaque_argument() {
    let (registry, _) = echo_registry();
    let gateway = gateway(registry);

    let invocation = gateway
        .invoke(
            "echo",
            &ParameterSet::from_query("cookie=xq_a_token=abc; u=1&symbol=SH600000"),
        )
        .await;

    assert_eq!(
        invocation.result.unwrap().as_str(),
        r#"[{"cookie":"xq_a_token=abc; u=1&symbol=SH600000"}]"#
    );
}

// ============================================================================
// Outcome classification
// ============================================================================

#[tokio::test]
async fn no_data_is_empty_result_and_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let registry = Arc::new(OperationRegistry::new("test"));
    registry.register(
        "empty",
        EmptyOperation {
            calls: calls.clone(),
        },
    );
    let gateway = gateway(registry);

    for _ in 0..2 {
        let invocation = gateway.invoke("empty", &ParameterSet::new()).await;
        assert!(matches!(invocation.result, Err(GatewayError::EmptyResult(ref op)) if op == "empty"));
        assert_eq!(invocation.cache_status, CacheStatus::Miss);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn invalid_parameters_pass_through() {
    let registry = Arc::new(OperationRegistry::new("test"));
    registry.register(
        "strict",
        FailingOperation::new(GatewayError::InvalidParameters(
            "unexpected argument 'bogus'".into(),
        )),
    );
    let gateway = gateway(registry);

    let invocation = gateway
        .invoke("strict", &ParameterSet::from_query("bogus=1"))
        .await;
    let err = invocation.result.unwrap_err();
    assert!(matches!(err, GatewayError::InvalidParameters(ref m) if m.contains("bogus")));
    assert!(err.is_not_found());
}

#[tokio::test]
async fn other_faults_become_provider_failure() {
    let failing = FailingOperation::new(GatewayError::Http("connection reset".into()));
    let calls = failing.calls.clone();
    let registry = Arc::new(OperationRegistry::new("test"));
    registry.register("flaky", failing);
    let gateway = gateway(registry);

    for _ in 0..2 {
        let invocation = gateway.invoke("flaky", &ParameterSet::new()).await;
        let err = invocation.result.unwrap_err();
        assert!(
            matches!(err, GatewayError::ProviderFailure(ref m) if m.contains("connection reset"))
        );
        assert!(err.is_server_error());
    }
    // Failures are never cached.
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn ragged_table_is_provider_failure() {
    struct Ragged;

    #[async_trait]
    impl Operation for Ragged {
        async fn call(&self, _args: &Arguments, _http: &ShapedClient) -> Result<Option<Table>> {
            let mut table = Table::new(["a", "b"]);
            table.push_row(vec![1i64.into()])?;
            Ok(Some(table))
        }
    }

    let registry = Arc::new(OperationRegistry::new("test"));
    registry.register("ragged", Ragged);
    let gateway = gateway(registry);

    let invocation = gateway.invoke("ragged", &ParameterSet::new()).await;
    assert!(matches!(
        invocation.result,
        Err(GatewayError::ProviderFailure(_))
    ));
}

// ============================================================================
// Admission
// ============================================================================

#[tokio::test(start_paused = true)]
async fn third_call_in_window_waits_for_admission() {
    let (registry, calls) = echo_registry();
    let gateway = Datagate::builder()
        .provider_arc(registry)
        .rate_limit(2, Duration::from_secs(60))
        .admission_jitter(Duration::ZERO, Duration::ZERO)
        .disable_cache()
        .no_random_delay()
        .build()
        .unwrap();
    let start = tokio::time::Instant::now();

    for n in 0..2 {
        let params = ParameterSet::from_query(&format!("n={n}"));
        assert!(gateway.invoke("echo", &params).await.is_success());
    }
    assert!(start.elapsed() < Duration::from_secs(1));

    let third = gateway.invoke("echo", &ParameterSet::from_query("n=2")).await;
    assert!(third.is_success());
    assert!(start.elapsed() >= Duration::from_secs(60));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}
