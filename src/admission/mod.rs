//! Sliding-window admission control for outbound provider calls.
//!
//! [`SlidingWindowLimiter`] grants at most `max_requests` admissions within
//! any trailing `window`. Callers over budget wait (they are never
//! rejected) until the oldest grant leaves the window, plus a small random
//! jitter so that queued callers do not wake in lockstep.
//!
//! # Queueing
//!
//! Waiters pass through a single async turnstile, so admissions are granted
//! in arrival order and a late caller cannot overtake one that is already
//! sleeping. The window itself lives behind a short synchronous lock that
//! is never held across an `.await`, which keeps [`remaining()`] cheap and
//! non-blocking.
//!
//! Time is measured with [`tokio::time::Instant`], so tests can drive the
//! limiter with `tokio::time::pause()`.
//!
//! [`remaining()`]: SlidingWindowLimiter::remaining

use std::collections::VecDeque;
use std::time::Duration;

use parking_lot::Mutex;
use rand::Rng;
use tokio::time::Instant;
use tracing::info;

use crate::telemetry;
use crate::{GatewayError, Result};

/// Configuration for the admission controller.
///
/// ```rust
/// # use datagate::AdmissionConfig;
/// # use std::time::Duration;
/// let config = AdmissionConfig::new()
///     .max_requests(5)
///     .window(Duration::from_secs(30));
/// ```
#[derive(Debug, Clone)]
pub struct AdmissionConfig {
    /// Grants allowed per window. Default: 10.
    pub max_requests: usize,
    /// Length of the trailing window. Default: 60s.
    pub window: Duration,
    /// Lower bound of the jitter added to each wait. Default: 100ms.
    pub jitter_min: Duration,
    /// Upper bound of the jitter added to each wait. Default: 500ms.
    pub jitter_max: Duration,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
            jitter_min: Duration::from_millis(100),
            jitter_max: Duration::from_millis(500),
        }
    }
}

impl AdmissionConfig {
    /// Create a new config with the default policy (10 per 60s).
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the number of grants allowed per window.
    pub fn max_requests(mut self, n: usize) -> Self {
        self.max_requests = n;
        self
    }

    /// Set the window length.
    pub fn window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }

    /// Set the jitter bounds added to each wait.
    pub fn jitter(mut self, min: Duration, max: Duration) -> Self {
        self.jitter_min = min;
        self.jitter_max = max;
        self
    }

    fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(GatewayError::Configuration(
                "rate limit max_requests must be at least 1".to_string(),
            ));
        }
        if self.window.is_zero() {
            return Err(GatewayError::Configuration(
                "rate limit window must be longer than zero".to_string(),
            ));
        }
        if self.jitter_min > self.jitter_max {
            return Err(GatewayError::Configuration(format!(
                "admission jitter min {:?} exceeds max {:?}",
                self.jitter_min, self.jitter_max
            )));
        }
        Ok(())
    }
}

/// Process-wide sliding-window rate limiter.
///
/// Shared by handle (`Arc<SlidingWindowLimiter>`) between every invocation.
pub struct SlidingWindowLimiter {
    config: AdmissionConfig,
    grants: Mutex<VecDeque<Instant>>,
    turnstile: tokio::sync::Mutex<()>,
}

impl SlidingWindowLimiter {
    /// Create a limiter from the given configuration.
    ///
    /// Fails with [`GatewayError::Configuration`] for a zero budget, a zero
    /// window, or inverted jitter bounds.
    pub fn new(config: AdmissionConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            grants: Mutex::new(VecDeque::with_capacity(config.max_requests)),
            turnstile: tokio::sync::Mutex::new(()),
            config,
        })
    }

    /// Grants allowed per window.
    pub fn max_requests(&self) -> usize {
        self.config.max_requests
    }

    /// Length of the trailing window.
    pub fn window(&self) -> Duration {
        self.config.window
    }

    /// Wait until an admission is granted, then record it.
    ///
    /// Never fails. Returns the time spent waiting (zero when capacity was
    /// immediately available).
    pub async fn acquire(&self) -> Duration {
        let _turn = self.turnstile.lock().await;
        let started = Instant::now();
        let mut waited = false;

        loop {
            let wait = {
                let mut grants = self.grants.lock();
                let now = Instant::now();
                self.purge(&mut grants, now);
                if grants.len() < self.config.max_requests {
                    grants.push_back(now);
                    break;
                }
                // Full window: the front entry is the oldest live grant.
                match grants.front() {
                    Some(oldest) => (*oldest + self.config.window).saturating_duration_since(now),
                    None => Duration::ZERO,
                }
            };

            let total = wait + self.jitter();
            info!(
                max_requests = self.config.max_requests,
                window_secs = self.config.window.as_secs(),
                wait_ms = total.as_millis() as u64,
                "rate limit reached, waiting for admission"
            );
            waited = true;
            tokio::time::sleep(total).await;
        }

        let elapsed = started.elapsed();
        if waited {
            metrics::counter!(telemetry::ADMISSION_WAITS_TOTAL).increment(1);
            metrics::histogram!(telemetry::ADMISSION_WAIT_SECONDS).record(elapsed.as_secs_f64());
        }
        elapsed
    }

    /// Unused capacity in the current window.
    ///
    /// Advisory only: the value may be stale by the time the caller acts.
    pub fn remaining(&self) -> usize {
        let mut grants = self.grants.lock();
        self.purge(&mut grants, Instant::now());
        self.config.max_requests.saturating_sub(grants.len())
    }

    /// Drop grants that have left the trailing window.
    fn purge(&self, grants: &mut VecDeque<Instant>, now: Instant) {
        while let Some(oldest) = grants.front() {
            if *oldest + self.config.window <= now {
                grants.pop_front();
            } else {
                break;
            }
        }
    }

    fn jitter(&self) -> Duration {
        let min = self.config.jitter_min.as_millis() as u64;
        let max = self.config.jitter_max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(min..=max))
    }
}
