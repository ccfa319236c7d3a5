//! Operations backed by an upstream JSON endpoint.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{Arguments, Operation};
use crate::shaper::ShapedClient;
use crate::types::Table;
use crate::{GatewayError, Result};

/// Forwards call arguments as query parameters to `url` and reads a JSON
/// array of row records back.
///
/// A `null` or `[]` body is "no data". A non-2xx status is
/// [`GatewayError::Api`]; any other body shape is a provider failure. When an allowed parameter list is set,
/// undeclared arguments are rejected before any request is made.
///
/// ```rust
/// # use datagate::HttpJsonOperation;
/// let op = HttpJsonOperation::new("https://example.com/api/hist")
///     .params(["symbol", "period"])
///     .description("Daily history");
/// ```
#[derive(Debug, Clone)]
pub struct HttpJsonOperation {
    url: String,
    params: Option<Vec<String>>,
    description: String,
}

impl HttpJsonOperation {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: None,
            description: String::new(),
        }
    }

    /// Restrict the accepted argument names.
    pub fn params<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.params = Some(names.into_iter().map(Into::into).collect());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl Operation for HttpJsonOperation {
    async fn call(&self, args: &Arguments, http: &ShapedClient) -> Result<Option<Table>> {
        if let Some(allowed) = &self.params {
            let known: Vec<&str> = allowed.iter().map(String::as_str).collect();
            args.ensure_known(&known)?;
        }

        let response = http.get(&self.url).query(args.as_pairs()).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Api {
                status: status.as_u16(),
                message: format!("upstream {}: {}", self.url, body.trim()),
            });
        }

        let body = response.text().await?;
        let value: Value = serde_json::from_str(&body).map_err(|e| {
            GatewayError::ProviderFailure(format!("upstream {} sent invalid JSON: {e}", self.url))
        })?;

        match value {
            Value::Null => Ok(None),
            Value::Array(records) if records.is_empty() => Ok(None),
            Value::Array(records) => {
                let table = Table::from_records(records)?;
                debug!(url = %self.url, rows = table.len(), "upstream returned rows");
                Ok(Some(table))
            }
            other => Err(GatewayError::ProviderFailure(format!(
                "upstream {} sent a JSON {}, expected an array of records",
                self.url,
                json_kind(&other)
            ))),
        }
    }

    fn description(&self) -> &str {
        &self.description
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
