//! Environment variable names used by this crate for convenient
//! configuration of the sink from a service's environment.
//!
//! These are purely helpers; [`ClickHouseConfig`] itself never reads the
//! environment.

use std::collections::BTreeSet;
use std::str::FromStr;
use std::time::Duration;

use crate::config::ClickHouseConfig;
use crate::error::ConfigError;

/// ClickHouse host name or IP. Required.
pub const LOG_SINK_CLICKHOUSE_HOST_ENV: &str = "LOG_SINK_CLICKHOUSE_HOST";

/// ClickHouse HTTP port.
pub const LOG_SINK_CLICKHOUSE_PORT_ENV: &str = "LOG_SINK_CLICKHOUSE_PORT";

/// ClickHouse database name.
pub const LOG_SINK_CLICKHOUSE_DB_ENV: &str = "LOG_SINK_CLICKHOUSE_DB";

/// ClickHouse target table name. Required.
pub const LOG_SINK_CLICKHOUSE_TABLE_ENV: &str = "LOG_SINK_CLICKHOUSE_TABLE";

pub const LOG_SINK_CLICKHOUSE_USER_ENV: &str = "LOG_SINK_CLICKHOUSE_USER";

pub const LOG_SINK_CLICKHOUSE_PASSWORD_ENV: &str = "LOG_SINK_CLICKHOUSE_PASSWORD";

/// Timestamp shift in minutes.
pub const LOG_SINK_TZ_OFFSET_ENV: &str = "LOG_SINK_TZ_OFFSET";

/// Name of the field to inject the event timestamp into.
pub const LOG_SINK_DATETIME_NAME_ENV: &str = "LOG_SINK_DATETIME_NAME";

/// `true` / `false`.
pub const LOG_SINK_ERROR_RESPONSE_AS_UNRECOVERABLE_ENV: &str =
    "LOG_SINK_ERROR_RESPONSE_AS_UNRECOVERABLE";

/// Comma-separated status codes, e.g. `502,503`.
pub const LOG_SINK_RETRYABLE_RESPONSE_CODES_ENV: &str = "LOG_SINK_RETRYABLE_RESPONSE_CODES";

/// Request timeout in seconds.
pub const LOG_SINK_REQUEST_TIMEOUT_ENV: &str = "LOG_SINK_REQUEST_TIMEOUT";

/// Connect timeout in seconds.
pub const LOG_SINK_CONNECT_TIMEOUT_ENV: &str = "LOG_SINK_CONNECT_TIMEOUT";

/// Read an environment variable or fall back to a provided default.
pub fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

impl ClickHouseConfig {
    /// Build a config from the `LOG_SINK_*` environment variables.
    ///
    /// Unset variables keep their defaults; host and table are required.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`ClickHouseConfig::from_env`] with a custom variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let host = get(LOG_SINK_CLICKHOUSE_HOST_ENV).ok_or(ConfigError::MissingField("host"))?;
        let table = get(LOG_SINK_CLICKHOUSE_TABLE_ENV).ok_or(ConfigError::MissingField("table"))?;
        let mut config = Self::new(host, table);

        if let Some(port) = get(LOG_SINK_CLICKHOUSE_PORT_ENV) {
            config.port = parse(LOG_SINK_CLICKHOUSE_PORT_ENV, &port)?;
        }
        if let Some(database) = get(LOG_SINK_CLICKHOUSE_DB_ENV) {
            config.database = database;
        }
        if let Some(user) = get(LOG_SINK_CLICKHOUSE_USER_ENV) {
            config.user = user;
        }
        if let Some(password) = lookup(LOG_SINK_CLICKHOUSE_PASSWORD_ENV) {
            config.password = password;
        }
        if let Some(offset) = get(LOG_SINK_TZ_OFFSET_ENV) {
            config.tz_offset = parse(LOG_SINK_TZ_OFFSET_ENV, &offset)?;
        }
        config.datetime_name = get(LOG_SINK_DATETIME_NAME_ENV);
        if let Some(flag) = get(LOG_SINK_ERROR_RESPONSE_AS_UNRECOVERABLE_ENV) {
            config.error_response_as_unrecoverable =
                parse(LOG_SINK_ERROR_RESPONSE_AS_UNRECOVERABLE_ENV, &flag.to_ascii_lowercase())?;
        }
        if let Some(codes) = get(LOG_SINK_RETRYABLE_RESPONSE_CODES_ENV) {
            config.retryable_response_codes = codes
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(|c| parse(LOG_SINK_RETRYABLE_RESPONSE_CODES_ENV, c))
                .collect::<Result<BTreeSet<u16>, _>>()?;
        }
        if let Some(secs) = get(LOG_SINK_REQUEST_TIMEOUT_ENV) {
            config.request_timeout = parse_secs(LOG_SINK_REQUEST_TIMEOUT_ENV, &secs)?;
        }
        if let Some(secs) = get(LOG_SINK_CONNECT_TIMEOUT_ENV) {
            config.connect_timeout = parse_secs(LOG_SINK_CONNECT_TIMEOUT_ENV, &secs)?;
        }

        Ok(config)
    }
}

fn parse<T>(key: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidEnv {
        key,
        reason: format!("{:?}: {}", value, e),
    })
}

fn parse_secs(key: &'static str, value: &str) -> Result<Duration, ConfigError> {
    let secs: f64 = parse(key, value)?;
    Duration::try_from_secs_f64(secs).map_err(|e| ConfigError::InvalidEnv {
        key,
        reason: e.to_string(),
    })
}
