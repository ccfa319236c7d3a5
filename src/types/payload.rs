//! Serialized invocation results.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use super::Table;
use crate::Result;

/// The JSON text of a successful invocation.
///
/// Shared, so cache hits hand out the same allocation to every caller.
#[derive(Clone, PartialEq, Eq)]
pub struct Payload(Arc<str>);

impl Payload {
    /// Serialize a table as row records.
    pub fn from_table(table: &Table) -> Result<Self> {
        Ok(Self(Arc::from(table.to_json()?)))
    }

    /// The JSON text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Size of the JSON text in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the JSON text back into a value.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.0)?)
    }
}

impl fmt::Debug for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Payload")
            .field(&format_args!("{} bytes", self.0.len()))
            .finish()
    }
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
