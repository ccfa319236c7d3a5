//! Datagate error types

/// Datagate error types
///
/// The first four variants are the invocation taxonomy reported to callers.
/// The rest are ambient failures (transport, decoding, configuration) that
/// the gateway folds into [`GatewayError::ProviderFailure`] when they escape
/// an operation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GatewayError {
    // Invocation taxonomy
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    #[error("operation {0} returned no data")]
    EmptyResult(String),

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("provider failure: {0}")]
    ProviderFailure(String),

    // Network/data errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(String),

    // Configuration errors
    #[error("no provider configured")]
    NoProvider,

    #[error("configuration error: {0}")]
    Configuration(String),
}

impl GatewayError {
    /// Outcomes the HTTP surface reports as not-found.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            GatewayError::UnknownOperation(_)
                | GatewayError::EmptyResult(_)
                | GatewayError::InvalidParameters(_)
        )
    }

    /// Outcomes the HTTP surface reports as a server error.
    pub fn is_server_error(&self) -> bool {
        !self.is_not_found()
    }

    /// Fold an error raised by an operation into the invocation taxonomy.
    ///
    /// Taxonomy variants pass through; everything else becomes
    /// [`GatewayError::ProviderFailure`] carrying the original message.
    pub(crate) fn into_outcome(self) -> Self {
        match self {
            e @ (GatewayError::UnknownOperation(_)
            | GatewayError::EmptyResult(_)
            | GatewayError::InvalidParameters(_)
            | GatewayError::ProviderFailure(_)) => e,
            other => GatewayError::ProviderFailure(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        GatewayError::Json(err.to_string())
    }
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => GatewayError::Api {
                status: status.as_u16(),
                message: err.to_string(),
            },
            None => GatewayError::Http(err.to_string()),
        }
    }
}

/// Result type alias for Datagate operations
pub type Result<T> = std::result::Result<T, GatewayError>;
