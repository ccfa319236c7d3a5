//! Gateway implementations

mod builder;
mod invocation;

pub use builder::{Datagate, DatagateBuilder};
pub use invocation::{Invocation, InvocationGateway};
