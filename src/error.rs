/// Error returned when a log event cannot be turned into a JSON line.
#[derive(thiserror::Error, Debug)]
pub enum FormatError {
    #[error("failed to encode log record as JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("cannot encode non-finite float {0} as JSON")]
    NonFiniteFloat(f64),
}

/// Error type returned when reading configuration from the environment.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got {value:?}")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be an RFC 3339 timestamp, got {value:?}")]
    InvalidTimestamp { key: &'static str, value: String },
}
