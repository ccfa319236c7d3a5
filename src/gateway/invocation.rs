//! InvocationGateway - cache, admission and dispatch for named operations

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::admission::SlidingWindowLimiter;
use crate::cache::{CacheKey, ResultCache};
use crate::provider::{Arguments, Provider};
use crate::shaper::ShapedClient;
use crate::telemetry;
use crate::types::{CacheStatus, ParameterSet, Payload};
use crate::{Gateway, GatewayError, Result};

/// Outcome of one invocation plus how the cache participated.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub result: Result<Payload>,
    pub cache_status: CacheStatus,
}

impl Invocation {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }

    pub fn into_result(self) -> Result<Payload> {
        self.result
    }
}

/// Gateway that resolves operation names against a provider, serving
/// repeated calls from the result cache and pacing the rest through the
/// admission controller.
///
/// Built with [`Datagate::builder()`](super::Datagate::builder). Share it
/// behind an `Arc`; every method takes `&self`.
pub struct InvocationGateway {
    provider: Arc<dyn Provider>,
    limiter: Arc<SlidingWindowLimiter>,
    cache: ResultCache,
    http: ShapedClient,
}

impl InvocationGateway {
    pub(crate) fn new(
        provider: Arc<dyn Provider>,
        limiter: Arc<SlidingWindowLimiter>,
        cache: ResultCache,
        http: ShapedClient,
    ) -> Self {
        Self {
            provider,
            limiter,
            cache,
            http,
        }
    }

    /// Invoke `operation` with `params`.
    ///
    /// 1. A cached payload for the same operation and canonical parameters
    ///    is returned as-is (`HIT`).
    /// 2. Otherwise the operation must be in the provider's current
    ///    capability set.
    /// 3. An admission grant is awaited.
    /// 4. The provider is called with the parameters as named arguments.
    /// 5. A successful payload is cached (`MISS`), or reported `DISABLED`
    ///    when caching is off.
    ///
    /// Concurrent misses on the same key share one provider call; the
    /// callers that did not run it report `HIT`.
    #[instrument(name = "gateway.invoke", skip(self, params), fields(params = %params))]
    pub async fn invoke(&self, operation: &str, params: &ParameterSet) -> Invocation {
        let start = Instant::now();

        let (result, cache_status) = if self.cache.is_enabled() {
            let key = CacheKey::new(operation, params);
            match self.cache.lookup(&key).await {
                Some(payload) => (Ok(payload), CacheStatus::Hit),
                None => {
                    let outcome = self
                        .cache
                        .get_or_try_insert_with(key, self.execute(operation, params))
                        .await;
                    match outcome {
                        Ok((payload, true)) => (Ok(payload), CacheStatus::Miss),
                        Ok((payload, false)) => (Ok(payload), CacheStatus::Hit),
                        Err(e) => (Err(e), CacheStatus::Miss),
                    }
                }
            }
        } else {
            (
                self.execute(operation, params).await,
                CacheStatus::Disabled,
            )
        };

        let outcome = outcome_label(&result);
        match &result {
            Ok(payload) => debug!(
                cache = %cache_status,
                bytes = payload.len(),
                "invocation succeeded"
            ),
            Err(e) if e.is_not_found() => info!(cache = %cache_status, error = %e, "invocation not found"),
            Err(e) => warn!(cache = %cache_status, error = %e, "invocation failed"),
        }

        // Unknown names come straight from callers; keep them out of labels.
        let op_label = if matches!(result, Err(GatewayError::UnknownOperation(_))) {
            "_unknown".to_string()
        } else {
            operation.to_string()
        };
        metrics::counter!(
            telemetry::INVOCATIONS_TOTAL,
            "operation" => op_label.clone(),
            "outcome" => outcome,
            "cache" => cache_status.as_str()
        )
        .increment(1);
        metrics::histogram!(telemetry::INVOCATION_DURATION_SECONDS, "operation" => op_label)
            .record(start.elapsed().as_secs_f64());

        Invocation {
            result,
            cache_status,
        }
    }

    /// Resolve, admit, call and classify. Never touches the cache.
    async fn execute(&self, operation: &str, params: &ParameterSet) -> Result<Payload> {
        if !self.provider.has_operation(operation) {
            return Err(GatewayError::UnknownOperation(operation.to_string()));
        }

        let waited = self.limiter.acquire().await;
        if !waited.is_zero() {
            debug!(waited_ms = waited.as_millis() as u64, "admission granted after wait");
        }

        let args = Arguments::from(params);
        match self.provider.call(operation, &args, &self.http).await {
            Ok(Some(table)) => Payload::from_table(&table).map_err(GatewayError::into_outcome),
            Ok(None) => Err(GatewayError::EmptyResult(operation.to_string())),
            Err(e) => Err(e.into_outcome()),
        }
    }

    /// Current capability set of the provider, sorted.
    pub fn operations(&self) -> Vec<String> {
        self.provider.operations()
    }

    /// Unused admission capacity in the current window. Advisory.
    pub fn remaining_admissions(&self) -> usize {
        self.limiter.remaining()
    }

    pub fn cache_enabled(&self) -> bool {
        self.cache.is_enabled()
    }

    pub fn cache(&self) -> &ResultCache {
        &self.cache
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }

    pub fn limiter(&self) -> &Arc<SlidingWindowLimiter> {
        &self.limiter
    }

    /// The shaped client handed to every operation call.
    pub fn http(&self) -> &ShapedClient {
        &self.http
    }
}

#[async_trait]
impl Gateway for InvocationGateway {
    async fn invoke(&self, operation: &str, params: &ParameterSet) -> Invocation {
        InvocationGateway::invoke(self, operation, params).await
    }

    fn operations(&self) -> Vec<String> {
        InvocationGateway::operations(self)
    }
}

fn outcome_label(result: &Result<Payload>) -> &'static str {
    match result {
        Ok(_) => "ok",
        Err(GatewayError::EmptyResult(_)) => "empty",
        Err(GatewayError::UnknownOperation(_)) => "unknown_operation",
        Err(GatewayError::InvalidParameters(_)) => "invalid_parameters",
        Err(_) => "provider_failure",
    }
}
