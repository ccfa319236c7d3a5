//! Provider binding: named operations and the registry that resolves them.
//!
//! A [`Provider`] publishes a capability set of operation identifiers and
//! executes calls by name. The set is queried on every invocation, so
//! operations may be registered or removed while the gateway is running.
//!
//! Every operation receives the gateway's [`ShapedClient`](crate::ShapedClient)
//! and performs all of its network I/O through it.

mod arguments;
mod http_json;
mod registry;
mod traits;

pub use arguments::Arguments;
pub use http_json::HttpJsonOperation;
pub use registry::OperationRegistry;
pub use traits::{Operation, Provider};
