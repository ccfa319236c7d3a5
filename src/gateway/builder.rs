//! Builder for configuring gateway instances

use std::sync::Arc;
use std::time::Duration;

use super::InvocationGateway;
use crate::admission::{AdmissionConfig, SlidingWindowLimiter};
use crate::cache::{CacheConfig, ResultCache};
use crate::config::GatewayConfig;
use crate::provider::Provider;
use crate::shaper::{ProxyConfig, ShapedClient, ShaperConfig};
use crate::{GatewayError, Result};

/// Main entry point for creating gateway instances.
pub struct Datagate;

impl Datagate {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> DatagateBuilder {
        DatagateBuilder::new()
    }
}

/// Builder for configuring gateway instances.
///
/// ```rust,no_run
/// use datagate::{Datagate, HttpJsonOperation, OperationRegistry};
/// use std::time::Duration;
///
/// let registry = OperationRegistry::new("upstream")
///     .with("quotes", HttpJsonOperation::new("https://example.com/quotes"));
///
/// let gateway = Datagate::builder()
///     .provider(registry)
///     .rate_limit(10, Duration::from_secs(60))
///     .build()?;
/// # Ok::<(), datagate::GatewayError>(())
/// ```
pub struct DatagateBuilder {
    provider: Option<Arc<dyn Provider>>,
    admission: AdmissionConfig,
    cache: Option<CacheConfig>,
    shaper: ShaperConfig,
    config_error: Option<GatewayError>,
}

impl DatagateBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            admission: AdmissionConfig::default(),
            cache: Some(CacheConfig::default()),
            shaper: ShaperConfig::default(),
            config_error: None,
        }
    }

    /// Set the provider whose operations the gateway exposes.
    pub fn provider(self, provider: impl Provider + 'static) -> Self {
        self.provider_arc(Arc::new(provider))
    }

    /// Set an already shared provider (e.g. a registry the caller keeps
    /// mutating after build).
    pub fn provider_arc(mut self, provider: Arc<dyn Provider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Apply a [`GatewayConfig`]: rate limit, cache, random delay and proxy.
    ///
    /// Invalid values are reported by [`build`](Self::build).
    pub fn config(mut self, config: &GatewayConfig) -> Self {
        if let Err(e) = config.validate() {
            self.config_error = Some(e);
            return self;
        }
        self.admission = config
            .admission()
            .jitter(self.admission.jitter_min, self.admission.jitter_max);
        self.cache = config.cache();
        self.shaper = self.shaper.proxy(config.proxy());
        if !config.random_delay_enable {
            self.shaper = self.shaper.no_random_delay();
        }
        self
    }

    /// Allow `max_requests` admissions per trailing `window`.
    pub fn rate_limit(mut self, max_requests: usize, window: Duration) -> Self {
        self.admission = self.admission.max_requests(max_requests).window(window);
        self
    }

    /// Set the jitter added to every admission wait.
    pub fn admission_jitter(mut self, min: Duration, max: Duration) -> Self {
        self.admission = self.admission.jitter(min, max);
        self
    }

    /// Enable the result cache with the given settings.
    pub fn cache(mut self, config: CacheConfig) -> Self {
        self.cache = Some(config);
        self
    }

    /// Turn the result cache off; every invocation reports `DISABLED`.
    pub fn disable_cache(mut self) -> Self {
        self.cache = None;
        self
    }

    /// Replace the whole shaper configuration.
    pub fn shaper(mut self, config: ShaperConfig) -> Self {
        self.shaper = config;
        self
    }

    /// Set the random pre-dispatch delay bounds for outbound requests.
    pub fn random_delay(mut self, min: Duration, max: Duration) -> Self {
        self.shaper = self.shaper.random_delay(min, max);
        self
    }

    /// Send outbound requests without a random delay.
    pub fn no_random_delay(mut self) -> Self {
        self.shaper = self.shaper.no_random_delay();
        self
    }

    /// Route outbound requests through `proxy`.
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.shaper = self.shaper.proxy(proxy);
        self
    }

    /// Set the outbound request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.shaper = self.shaper.timeout(timeout);
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<InvocationGateway> {
        if let Some(e) = self.config_error {
            return Err(e);
        }
        let provider = self.provider.ok_or(GatewayError::NoProvider)?;

        let limiter = Arc::new(SlidingWindowLimiter::new(self.admission)?);
        let cache = match &self.cache {
            Some(config) => ResultCache::new(config),
            None => ResultCache::disabled(),
        };
        let http = ShapedClient::new(self.shaper)?;

        Ok(InvocationGateway::new(provider, limiter, cache, http))
    }
}

impl Default for DatagateBuilder {
    fn default() -> Self {
        Self::new()
    }
}
