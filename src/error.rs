/// Error returned when a record cannot be turned into a `JSONEachRow` line.
///
/// This is a per-record failure and is never worth retrying: the same
/// record will fail the same way every time. Callers should drop or
/// surface the offending record and keep going.
#[derive(thiserror::Error, Debug)]
pub enum SerializationError {
    #[error("record must serialize to a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("timestamp {timestamp} shifted by {tz_offset_minutes} minutes overflows")]
    TimestampOverflow { timestamp: i64, tz_offset_minutes: i64 },

    #[error("record is not representable as JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Error type returned while building or checking a sink configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("invalid DSN: {0}")]
    InvalidDsn(String),

    #[error("invalid environment variable {key}: {reason}")]
    InvalidEnv { key: &'static str, reason: String },

    #[error("couldn't connect to ClickHouse at {endpoint} - connection refused")]
    ConnectionRefused { endpoint: String },

    #[error("couldn't reach ClickHouse at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },

    #[error("ClickHouse server responded non-200 code {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
}
