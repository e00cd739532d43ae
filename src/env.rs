//! Environment variable names used by this crate for configuring the
//! formatter from a service's deployment settings.
//!
//! These are purely helpers; [`FormatterConfig`] itself never reads the
//! environment unless [`FormatterConfig::from_env`] is called.

use crate::config::FormatterConfig;
use crate::error::ConfigError;
use chrono::DateTime;

/// Application root stripped from emitted file paths, e.g. `/srv/app`.
pub const LOG_FORMAT_BASE_PATH_ENV: &str = "LOG_FORMAT_BASE_PATH";

/// Maximum number of frames in the call-site trace. `0` disables the limit.
pub const LOG_FORMAT_CALL_SITE_LIMIT_ENV: &str = "LOG_FORMAT_CALL_SITE_LIMIT";

/// Fixed RFC 3339 timestamp for every record. Test environments only.
pub const LOG_FORMAT_FIXED_TIME_ENV: &str = "LOG_FORMAT_FIXED_TIME";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Cargo's home directory: `CARGO_HOME`, else `$HOME/.cargo`.
pub fn cargo_home() -> String {
    match std::env::var("CARGO_HOME") {
        Ok(home) => home,
        Err(_) => format!("{}/.cargo", env_or("HOME", "")),
    }
}

impl FormatterConfig {
    /// Build a config from defaults overridden by the `LOG_FORMAT_*`
    /// environment variables.
    ///
    /// **Returns**
    /// - `Err(ConfigError)` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = FormatterConfig::default();
        config.base_path = env_or(LOG_FORMAT_BASE_PATH_ENV, "");

        if let Ok(raw) = std::env::var(LOG_FORMAT_CALL_SITE_LIMIT_ENV) {
            let limit: usize = raw.trim().parse().map_err(|_| ConfigError::InvalidNumber {
                key: LOG_FORMAT_CALL_SITE_LIMIT_ENV,
                value: raw.clone(),
            })?;
            config.call_site_limit = if limit == 0 { None } else { Some(limit) };
        }

        if let Ok(raw) = std::env::var(LOG_FORMAT_FIXED_TIME_ENV) {
            let time = DateTime::parse_from_rfc3339(raw.trim()).map_err(|_| ConfigError::InvalidTimestamp {
                key: LOG_FORMAT_FIXED_TIME_ENV,
                value: raw.clone(),
            })?;
            config.fixed_time = Some(time);
        }

        Ok(config)
    }
}
