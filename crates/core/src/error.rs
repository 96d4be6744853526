//! Configuration error types.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised while loading or validating bot configuration.
///
/// All of these are fatal at startup.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Settings file does not exist.
    #[error("{path} not found")]
    NotFound {
        /// Path that was looked up.
        path: String,
    },

    /// Settings could not be parsed or a required key is missing.
    #[error("failed to parse settings: {0}")]
    Parse(String),

    /// An out-of-the-money margin is outside the open interval (0, 1).
    #[error("{field} must be strictly between 0 and 1 (got {value})")]
    MarginOutOfRange {
        /// Settings key.
        field: &'static str,
        /// Rejected value.
        value: Decimal,
    },

    /// Timezone is not a known IANA name.
    #[error("Unknown timezone '{0}'")]
    UnknownTimezone(String),

    /// Cron expression failed to parse.
    #[error("Invalid cron pattern '{pattern}': {reason}")]
    InvalidCron {
        /// The rejected expression.
        pattern: String,
        /// What was wrong with it.
        reason: String,
    },

    /// Any other field-level validation failure.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// Settings key.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Required environment variables are absent or empty.
    #[error("{0}")]
    MissingEnv(String),
}

impl ConfigError {
    /// Creates a cron error.
    pub fn invalid_cron(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidCron {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Creates a generic field validation error.
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Parse(err.to_string())
    }
}
