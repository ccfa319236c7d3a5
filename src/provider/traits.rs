//! Operation and provider traits.

use async_trait::async_trait;

use super::Arguments;
use crate::Result;
use crate::shaper::ShapedClient;
use crate::types::Table;

// ============================================================================
// Operation
// ============================================================================

/// A single named data-fetch capability.
///
/// Return `Ok(None)` when the upstream has no data for the arguments; the
/// gateway reports that as [`EmptyResult`](crate::GatewayError::EmptyResult).
/// Return [`InvalidParameters`](crate::GatewayError::InvalidParameters) for
/// arguments the operation does not accept. Any other error is reported as
/// a provider failure.
#[async_trait]
pub trait Operation: Send + Sync {
    /// Execute the operation. All outbound HTTP must go through `http`.
    async fn call(&self, args: &Arguments, http: &ShapedClient) -> Result<Option<Table>>;

    /// Short human-readable description.
    fn description(&self) -> &str {
        ""
    }
}

// ============================================================================
// Provider
// ============================================================================

/// A source of named operations.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name for logging/debugging.
    fn name(&self) -> &str;

    /// Whether `id` is in the current capability set.
    fn has_operation(&self, id: &str) -> bool;

    /// The current capability set, sorted.
    fn operations(&self) -> Vec<String>;

    /// Execute operation `id`.
    ///
    /// Returns [`UnknownOperation`](crate::GatewayError::UnknownOperation) if
    /// `id` is not (or no longer) in the capability set.
    async fn call(&self, id: &str, args: &Arguments, http: &ShapedClient)
    -> Result<Option<Table>>;
}
