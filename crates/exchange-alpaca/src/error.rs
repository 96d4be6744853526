//! Error types for the Alpaca integration.

use thiserror::Error;

/// Errors that can occur when talking to Alpaca.
#[derive(Debug, Error)]
pub enum AlpacaError {
    /// API request returned a non-success status.
    #[error("API error: {status_code} - {message}")]
    Api {
        /// HTTP status code.
        status_code: u16,
        /// Response body.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Response body could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Client could not be configured.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Symbol or identifier is not safe to place in a URL path.
    #[error("invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Order not found.
    #[error("order not found: {order_id}")]
    OrderNotFound {
        /// The order ID that was not found.
        order_id: String,
    },
}

impl AlpacaError {
    /// Creates an API error from status code and message.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status_code,
            message: message.into(),
        }
    }

    /// Creates a rate limit error.
    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// Creates an order not found error.
    pub fn order_not_found(order_id: impl Into<String>) -> Self {
        Self::OrderNotFound {
            order_id: order_id.into(),
        }
    }

    /// Returns true for a 404 response.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Api {
                status_code: 404,
                ..
            } | Self::OrderNotFound { .. }
        )
    }
}

impl From<reqwest::Error> for AlpacaError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else if err.is_decode() {
            Self::Serialization(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for AlpacaError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for Alpaca operations.
pub type Result<T> = std::result::Result<T, AlpacaError>;
