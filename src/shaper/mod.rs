//! Outbound request shaping.
//!
//! Every network call an operation makes goes through a [`ShapedClient`],
//! which applies one uniform policy:
//!
//! - a fixed browser identity header set ([`identity::browser_headers`]),
//!   with caller-supplied headers taking precedence per field;
//! - the configured proxy, unless the request picks its own route
//!   ([`ShapedRequest::direct`] or [`ShapedRequest::proxy`]);
//! - a random delay before dispatch, unless disabled.
//!
//! # Architecture
//!
//! The gateway builds one `ShapedClient` at startup and hands it to every
//! operation call. Operations never see a bare `reqwest::Client`, so the
//! policy cannot be bypassed by a particular operation.
//!
//! ```rust,ignore
//! async fn call(&self, args: &Arguments, http: &ShapedClient) -> Result<Option<Table>> {
//!     let response = http
//!         .get("https://example.com/quotes")
//!         .query(&[("symbol", args.require("symbol")?)])
//!         .header("referer", "https://example.com/")
//!         .send()
//!         .await?;
//!     // ...
//! }
//! ```

pub mod identity;

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Proxy, Response};
use serde::Serialize;
use tracing::debug;

use crate::telemetry;
use crate::{GatewayError, Result};

pub use identity::{CHROME_USER_AGENT, browser_headers, merge_headers};

/// Upper bound on distinct per-request proxies kept with a live client.
const MAX_CUSTOM_PROXY_CLIENTS: u64 = 16;

/// Proxy endpoints applied to outbound requests.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProxyConfig {
    /// Proxy for `http://` targets.
    pub http: Option<String>,
    /// Proxy for `https://` targets. Falls back to `http` when unset.
    pub https: Option<String>,
}

impl ProxyConfig {
    /// Read proxies from the environment.
    ///
    /// HTTP proxy: `DATAGATE_HTTP_PROXY`, then `HTTP_PROXY`, then
    /// `http_proxy`. HTTPS proxy likewise with the `HTTPS_` names.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Resolve proxies through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let first = |names: &[&str]| {
            names
                .iter()
                .filter_map(|name| lookup(*name))
                .find(|value| !value.trim().is_empty())
        };
        Self {
            http: first(&["DATAGATE_HTTP_PROXY", "HTTP_PROXY", "http_proxy"]),
            https: first(&["DATAGATE_HTTPS_PROXY", "HTTPS_PROXY", "https_proxy"]),
        }
    }

    /// Whether no proxy is configured at all.
    pub fn is_empty(&self) -> bool {
        self.http.is_none() && self.https.is_none()
    }

    /// Proxy used for `https://` targets after the HTTP fallback.
    pub fn effective_https(&self) -> Option<&str> {
        self.https.as_deref().or(self.http.as_deref())
    }
}

/// Configuration for the request shaper.
#[derive(Debug, Clone)]
pub struct ShaperConfig {
    /// Identity headers attached to every request.
    pub identity: HeaderMap,
    /// Proxy applied when a request does not choose its own route.
    pub proxy: ProxyConfig,
    /// Random pre-dispatch delay bounds; `None` disables the delay.
    pub random_delay: Option<(Duration, Duration)>,
    /// Per-request timeout. Default: 60s.
    pub timeout: Duration,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            identity: browser_headers(),
            proxy: ProxyConfig::default(),
            random_delay: Some((Duration::from_millis(100), Duration::from_millis(500))),
            timeout: Duration::from_secs(60),
        }
    }
}

impl ShaperConfig {
    /// Create a config with the browser identity, no proxy and a
    /// 100–500ms random delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the proxy configuration.
    pub fn proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = proxy;
        self
    }

    /// Set the random delay bounds.
    pub fn random_delay(mut self, min: Duration, max: Duration) -> Self {
        self.random_delay = Some((min, max));
        self
    }

    /// Disable the random delay.
    pub fn no_random_delay(mut self) -> Self {
        self.random_delay = None;
        self
    }

    /// Set the per-request timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// HTTP client that applies the shaping policy to every request.
///
/// Cheap to clone; clones share connection pools.
#[derive(Clone)]
pub struct ShapedClient {
    inner: Arc<Inner>,
}

struct Inner {
    proxied: Client,
    direct: Client,
    custom: moka::sync::Cache<String, Client>,
    identity: HeaderMap,
    random_delay: Option<(Duration, Duration)>,
    timeout: Duration,
}

impl ShapedClient {
    /// Build the client. Proxies are resolved once, here.
    pub fn new(config: ShaperConfig) -> Result<Self> {
        if let Some((min, max)) = config.random_delay
            && min > max
        {
            return Err(GatewayError::Configuration(format!(
                "random delay min {min:?} exceeds max {max:?}"
            )));
        }

        let direct = build_client(config.timeout, None, None)?;
        let proxied = if config.proxy.is_empty() {
            direct.clone()
        } else {
            build_client(
                config.timeout,
                config.proxy.http.as_deref(),
                config.proxy.effective_https(),
            )?
        };

        Ok(Self {
            inner: Arc::new(Inner {
                proxied,
                direct,
                custom: moka::sync::Cache::new(MAX_CUSTOM_PROXY_CLIENTS),
                identity: config.identity,
                random_delay: config.random_delay,
                timeout: config.timeout,
            }),
        })
    }

    /// Identity headers attached to every request.
    pub fn identity(&self) -> &HeaderMap {
        &self.inner.identity
    }

    /// Whether a random delay precedes each request.
    pub fn delays_requests(&self) -> bool {
        self.inner.random_delay.is_some()
    }

    /// Start a GET request.
    pub fn get(&self, url: impl Into<String>) -> ShapedRequest<'_> {
        self.request(Method::GET, url)
    }

    /// Start a POST request.
    pub fn post(&self, url: impl Into<String>) -> ShapedRequest<'_> {
        self.request(Method::POST, url)
    }

    /// Start a request with an arbitrary method.
    pub fn request(&self, method: Method, url: impl Into<String>) -> ShapedRequest<'_> {
        ShapedRequest {
            client: self,
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
            route: Route::Configured,
            timeout: None,
            error: None,
        }
    }

    fn client_for(&self, route: &Route) -> Result<Client> {
        match route {
            Route::Configured => Ok(self.inner.proxied.clone()),
            Route::Direct => Ok(self.inner.direct.clone()),
            Route::Via(url) => self
                .inner
                .custom
                .try_get_with(url.clone(), || {
                    build_client(self.inner.timeout, Some(url.as_str()), Some(url.as_str()))
                })
                .map_err(|e| (*e).clone()),
        }
    }

    fn delay(&self) -> Option<Duration> {
        let (min, max) = self.inner.random_delay?;
        let ms = rand::rng().random_range(min.as_millis() as u64..=max.as_millis() as u64);
        Some(Duration::from_millis(ms))
    }
}

fn build_client(timeout: Duration, http: Option<&str>, https: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder().timeout(timeout).no_proxy();
    if let Some(url) = http {
        let proxy = Proxy::http(url).map_err(|e| {
            GatewayError::Configuration(format!("invalid HTTP proxy {url:?}: {e}"))
        })?;
        builder = builder.proxy(proxy);
    }
    if let Some(url) = https {
        let proxy = Proxy::https(url).map_err(|e| {
            GatewayError::Configuration(format!("invalid HTTPS proxy {url:?}: {e}"))
        })?;
        builder = builder.proxy(proxy);
    }
    builder
        .build()
        .map_err(|e| GatewayError::Configuration(format!("failed to build HTTP client: {e}")))
}

enum Route {
    Configured,
    Direct,
    Via(String),
}

enum Body {
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
}

/// A request under construction.
///
/// Builder errors (bad header names, unserializable bodies) are deferred and
/// reported by [`send`](Self::send), mirroring `reqwest::RequestBuilder`.
#[must_use = "a request does nothing until sent"]
pub struct ShapedRequest<'a> {
    client: &'a ShapedClient,
    method: Method,
    url: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Body>,
    route: Route,
    timeout: Option<Duration>,
    error: Option<GatewayError>,
}

impl ShapedRequest<'_> {
    /// Set a header. Overrides the identity header of the same name.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                self.headers.append(name, value);
            }
            _ => {
                self.error.get_or_insert(GatewayError::Http(format!(
                    "invalid header {name:?}"
                )));
            }
        }
        self
    }

    /// Merge a header map. Overrides identity headers of the same names.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        for (name, value) in &headers {
            self.headers.append(name.clone(), value.clone());
        }
        self
    }

    /// Append query parameters.
    pub fn query<K: AsRef<str>, V: AsRef<str>>(mut self, pairs: &[(K, V)]) -> Self {
        self.query.extend(
            pairs
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string())),
        );
        self
    }

    /// Send a JSON body.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.body = Some(Body::Json(value)),
            Err(e) => {
                self.error.get_or_insert(e.into());
            }
        }
        self
    }

    /// Send a form-encoded body.
    pub fn form<K: AsRef<str>, V: AsRef<str>>(mut self, pairs: &[(K, V)]) -> Self {
        self.body = Some(Body::Form(
            pairs
                .iter()
                .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
                .collect(),
        ));
        self
    }

    /// Override the client timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Bypass the configured proxy for this request.
    pub fn direct(mut self) -> Self {
        self.route = Route::Direct;
        self
    }

    /// Route this request through the given proxy instead of the configured one.
    pub fn proxy(mut self, url: impl Into<String>) -> Self {
        self.route = Route::Via(url.into());
        self
    }

    /// Apply the shaping policy and dispatch the request.
    ///
    /// Returns the response for any HTTP status; transport failures are
    /// [`GatewayError::Http`].
    pub async fn send(self) -> Result<Response> {
        if let Some(err) = self.error {
            return Err(err);
        }

        let client = self.client.client_for(&self.route)?;
        let headers = merge_headers(&self.client.inner.identity, &self.headers);

        let mut request = client
            .request(self.method.clone(), &self.url)
            .headers(headers);
        if !self.query.is_empty() {
            request = request.query(&self.query);
        }
        request = match self.body {
            Some(Body::Json(value)) => request.json(&value),
            Some(Body::Form(pairs)) => request.form(&pairs),
            None => request,
        };
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        if let Some(delay) = self.client.delay() {
            debug!(delay_ms = delay.as_millis() as u64, url = %self.url, "pacing outbound request");
            tokio::time::sleep(delay).await;
        }

        match request.send().await {
            Ok(response) => {
                metrics::counter!(telemetry::OUTBOUND_REQUESTS_TOTAL, "status" => "ok").increment(1);
                debug!(method = %self.method, url = %self.url, status = response.status().as_u16(), "outbound request completed");
                Ok(response)
            }
            Err(e) => {
                metrics::counter!(telemetry::OUTBOUND_REQUESTS_TOTAL, "status" => "error")
                    .increment(1);
                Err(GatewayError::Http(e.to_string()))
            }
        }
    }
}
