//! Forward structured records to ClickHouse over HTTP.
//!
//! A buffering scheduler (not part of this crate) calls
//! [`OutputSink::format`] for every record and [`OutputSink::write`] for
//! every chunk of formatted lines. [`ClickHouseSink`] POSTs each chunk as
//! `INSERT INTO <table> FORMAT JSONEachRow` and returns a [`Disposition`]
//! telling the scheduler whether to release, retry or escalate the chunk.
//!
//! Delivery is at-least-once when the scheduler retries every
//! `RetryableFailure`. With the default configuration, error responses
//! whose status is not retryable are logged and the chunk is dropped
//! ([`Disposition::SilentFailure`]); enable
//! `error_response_as_unrecoverable` to escalate them instead.

pub mod config;
pub mod disposition;
pub mod endpoint;
pub mod env;
pub mod error;
pub mod format;
pub mod record;
pub mod sink;

pub mod clickhouse;

pub mod init;

pub use clickhouse::{ClickHouseSink, DeliveryStatsSnapshot};
pub use config::ClickHouseConfig;
pub use disposition::{DeliveryError, Disposition, ResponsePolicy};
pub use error::{ConfigError, SerializationError};
pub use record::Record;
pub use sink::OutputSink;
