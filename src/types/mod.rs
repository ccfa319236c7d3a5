//! Public types for the Datagate API.

mod cache_status;
mod params;
mod payload;
mod table;

pub use cache_status::CacheStatus;
pub use params::{Parameter, ParameterSet};
pub use payload::Payload;
pub use table::{Cell, Table};
