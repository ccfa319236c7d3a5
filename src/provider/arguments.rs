//! Named call arguments.

use std::str::FromStr;

use crate::types::ParameterSet;
use crate::{GatewayError, Result};

/// Named string arguments for one operation call, in caller order.
///
/// When a name is supplied more than once the last value wins.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Arguments {
    args: Vec<(String, String)>,
}

impl Arguments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an argument, replacing an earlier one with the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.args.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.args.push((name, value)),
        }
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value of `name`, or `default` when absent.
    pub fn get_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get(name).unwrap_or(default)
    }

    /// Value of `name`; a missing argument is `InvalidParameters`.
    pub fn require(&self, name: &str) -> Result<&str> {
        self.get(name).ok_or_else(|| {
            GatewayError::InvalidParameters(format!("missing required argument '{name}'"))
        })
    }

    /// Parse `name` into `T`. Absent is `Ok(None)`; unparsable is
    /// `InvalidParameters`.
    pub fn parse<T>(&self, name: &str) -> Result<Option<T>>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(name)
            .map(|raw| {
                raw.parse::<T>().map_err(|e| {
                    GatewayError::InvalidParameters(format!(
                        "argument '{name}' has invalid value {raw:?}: {e}"
                    ))
                })
            })
            .transpose()
    }

    /// Reject any argument whose name is not in `known`.
    pub fn ensure_known(&self, known: &[&str]) -> Result<()> {
        match self.args.iter().find(|(n, _)| !known.contains(&n.as_str())) {
            Some((name, _)) => Err(GatewayError::InvalidParameters(format!(
                "unexpected argument '{name}'"
            ))),
            None => Ok(()),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.args.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub(crate) fn as_pairs(&self) -> &[(String, String)] {
        &self.args
    }
}

impl From<&ParameterSet> for Arguments {
    fn from(params: &ParameterSet) -> Self {
        let mut args = Arguments::new();
        for param in params {
            args.insert(param.name.as_str(), param.value.as_str());
        }
        args
    }
}
