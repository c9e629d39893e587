use thiserror::Error;

/// Result type for pricing operations
pub type PricingResult<T> = Result<T, PricingError>;

/// Errors that can occur while resolving prices
#[derive(Debug, Error)]
pub enum PricingError {
    /// Transport-level failure (connect, timeout, TLS, body read)
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The pricing API answered with a non-2xx status
    #[error("Pricing API request failed with status {status}, response: {body}")]
    Status { status: u16, body: String },

    /// The response body was not the expected JSON array
    #[error("Invalid pricing API response: {0}")]
    Decode(String),

    /// A value could not be encoded as JSON
    #[error("Failed to encode: {0}")]
    Encode(#[from] serde_json::Error),

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl PricingError {
    /// Whether the pricing API call is worth retrying.
    ///
    /// Timeouts, connection failures, 429 and 5xx responses are transient;
    /// everything else fails the same way on every attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            PricingError::Transport(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            PricingError::Status { status, .. } => *status == 429 || *status >= 500,
            PricingError::Decode(_)
            | PricingError::Encode(_)
            | PricingError::InvalidInput(_)
            | PricingError::Internal(_) => false,
        }
    }
}
