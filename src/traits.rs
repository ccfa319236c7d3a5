//! Core Gateway trait

use async_trait::async_trait;

use crate::gateway::Invocation;
use crate::types::ParameterSet;

/// A gateway that invokes named operations.
///
/// The HTTP surface is generic over this trait, so alternative gateways
/// (test doubles, remote gateways) can be served the same way as
/// [`InvocationGateway`](crate::InvocationGateway).
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Invoke `operation` with `params`. Never fails outright: the outcome,
    /// including every error, is carried in the returned [`Invocation`].
    async fn invoke(&self, operation: &str, params: &ParameterSet) -> Invocation;

    /// Operation identifiers currently available, sorted.
    fn operations(&self) -> Vec<String>;
}
