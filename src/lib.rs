//! Datagate - rate-limited, caching invocation gateway for named data-fetch
//! operations
//!
//! A caller names an operation and supplies string parameters; the gateway
//! resolves the name against a [`Provider`]'s current capability set,
//! serves repeats from a TTL + LRU [`ResultCache`], paces real calls
//! through a sliding-window [`SlidingWindowLimiter`], and routes all of the
//! operation's outbound HTTP through a [`ShapedClient`] that applies a
//! browser identity, an optional proxy and a random delay.
//!
//! # Example
//!
//! ```rust,no_run
//! use datagate::{Datagate, HttpJsonOperation, OperationRegistry, ParameterSet};
//!
//! #[tokio::main]
//! async fn main() -> datagate::Result<()> {
//!     let registry = OperationRegistry::new("upstream").with(
//!         "stock_zh_a_hist",
//!         HttpJsonOperation::new("https://example.com/api/hist").params(["symbol", "period"]),
//!     );
//!
//!     let gateway = Datagate::builder().provider(registry).build()?;
//!
//!     let params = ParameterSet::from_query("symbol=000001&period=daily");
//!     let invocation = gateway.invoke("stock_zh_a_hist", &params).await;
//!
//!     println!("[{}] {}", invocation.cache_status, invocation.result?);
//!     Ok(())
//! }
//! ```

pub mod admission;
pub mod cache;
pub mod config;
pub mod error;
pub mod gateway;
pub mod provider;
#[cfg(feature = "server")]
pub mod server;
pub mod shaper;
pub mod telemetry;
pub mod traits;
pub mod types;

/// Package version from Cargo.toml.
pub const PKG_VERSION: &str = env!("CARGO_PKG_VERSION");

// Re-export main types at crate root
pub use admission::{AdmissionConfig, SlidingWindowLimiter};
pub use cache::{CacheConfig, CacheKey, ResultCache};
pub use config::GatewayConfig;
pub use error::{GatewayError, Result};
pub use gateway::{Datagate, DatagateBuilder, Invocation, InvocationGateway};
pub use provider::{Arguments, HttpJsonOperation, Operation, OperationRegistry, Provider};
pub use shaper::{ProxyConfig, ShapedClient, ShapedRequest, ShaperConfig};
pub use traits::Gateway;
pub use types::{CacheStatus, Cell, Parameter, ParameterSet, Payload, Table};
