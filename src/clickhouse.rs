use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, error, warn};

use crate::config::ClickHouseConfig;
use crate::disposition::{Disposition, ResponsePolicy};
use crate::endpoint::Endpoint;
use crate::error::{ConfigError, SerializationError};
use crate::format::RecordFormatter;
use crate::record::Record;
use crate::sink::{BufferSettings, OutputSink};

/// ClickHouse implementation of [`OutputSink`] using the HTTP interface.
///
/// Each batch is POSTed as the body of
/// `INSERT INTO <table> FORMAT JSONEachRow`. Clones share the HTTP client
/// and the delivery counters.
#[derive(Clone)]
pub struct ClickHouseSink {
    client: Client,
    endpoint: Endpoint,
    table: String,
    formatter: RecordFormatter,
    policy: ResponsePolicy,
    stats: Arc<DeliveryStats>,
}

impl ClickHouseSink {
    /// Construct a new sink from a validated configuration.
    ///
    /// **Parameters**
    /// - `config`: [`ClickHouseConfig`] describing target host, database,
    ///   table, credentials and response handling.
    ///
    /// **Returns**
    /// - A ready-to-use [`ClickHouseSink`]. No request is made; see
    ///   [`ClickHouseSink::connect`] for a checked variant.
    /// - `Err(ConfigError)` if the config fails validation.
    pub fn new(config: ClickHouseConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let endpoint = Endpoint::from_config(&config)?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(ConfigError::Client)?;

        Ok(Self {
            client,
            endpoint,
            formatter: RecordFormatter::new(config.tz_offset, config.datetime_name.clone()),
            policy: config.response_policy(),
            table: config.table,
            stats: Arc::new(DeliveryStats::default()),
        })
    }

    /// Build the sink and check that ClickHouse answers before returning it.
    pub async fn connect(config: ClickHouseConfig) -> Result<Self, ConfigError> {
        let sink = Self::new(config)?;
        sink.test_connection().await?;
        Ok(sink)
    }

    /// Run `SHOW TABLES` against the endpoint.
    ///
    /// **Returns**
    /// - `Ok(())` if ClickHouse answered with status 200.
    /// - `Err(ConfigError::ConnectionRefused)` if nothing listens on the
    ///   configured port.
    /// - `Err(..)` for any other transport failure or status.
    pub async fn test_connection(&self) -> Result<(), ConfigError> {
        let url = self.endpoint.url_for("SHOW TABLES");
        let resp = self.client.get(url).send().await.map_err(|e| {
            if is_connection_refused(&e) {
                ConfigError::ConnectionRefused {
                    endpoint: self.endpoint.to_string(),
                }
            } else {
                ConfigError::Unreachable {
                    endpoint: self.endpoint.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let status = resp.status();
        if status != StatusCode::OK {
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            return Err(ConfigError::UnexpectedStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    /// Insert `batch` into the configured table.
    pub async fn deliver(&self, batch: &[u8]) -> Disposition {
        self.deliver_to(&self.table, batch).await
    }

    /// Insert `batch` into `table` and classify the outcome.
    ///
    /// `batch` must already be newline-delimited JSON; it is sent as-is.
    /// Transport failures, including the request timeout, are always
    /// retryable because no response was received.
    pub async fn deliver_to(&self, table: &str, batch: &[u8]) -> Disposition {
        let url = self.endpoint.insert_url(table);
        let result = self.client.post(url).body(batch.to_vec()).send().await;

        let disposition = match result {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    Disposition::Success
                } else {
                    let text = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
                    self.policy.classify(status.as_u16(), &text)
                }
            }
            Err(e) if e.is_timeout() => {
                Disposition::RetryableFailure(format!("request to {} timed out: {}", self.endpoint, e))
            }
            Err(e) => Disposition::RetryableFailure(format!("request to {} failed: {}", self.endpoint, e)),
        };

        self.record_outcome(table, batch.len(), &disposition);
        disposition
    }

    fn record_outcome(&self, table: &str, bytes: usize, disposition: &Disposition) {
        match disposition {
            Disposition::Success => {
                self.stats.delivered.fetch_add(1, Ordering::Relaxed);
                self.stats.bytes_delivered.fetch_add(bytes as u64, Ordering::Relaxed);
                debug!(table, bytes, "batch delivered to ClickHouse");
            }
            Disposition::RetryableFailure(reason) => {
                self.stats.retryable.fetch_add(1, Ordering::Relaxed);
                warn!(table, bytes, %reason, "ClickHouse delivery failed, batch will be retried");
            }
            Disposition::PermanentFailure(reason) => {
                self.stats.permanent.fetch_add(1, Ordering::Relaxed);
                error!(table, bytes, %reason, "ClickHouse rejected batch, giving up");
            }
            Disposition::SilentFailure(reason) => {
                let dropped = self.stats.silently_dropped.fetch_add(1, Ordering::Relaxed) + 1;
                error!(
                    table,
                    bytes,
                    dropped_total = dropped,
                    %reason,
                    "ClickHouse rejected batch; batch DROPPED without retry \
                     (set error_response_as_unrecoverable to escalate instead)"
                );
            }
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn formatter(&self) -> &RecordFormatter {
        &self.formatter
    }

    pub fn stats(&self) -> DeliveryStatsSnapshot {
        self.stats.snapshot()
    }
}

fn is_connection_refused(err: &reqwest::Error) -> bool {
    if !err.is_connect() {
        return false;
    }
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            return io.kind() == std::io::ErrorKind::ConnectionRefused;
        }
        source = std::error::Error::source(cause);
    }
    false
}

#[async_trait]
impl OutputSink for ClickHouseSink {
    fn format(&self, _tag: &str, timestamp: i64, record: Record) -> Result<String, SerializationError> {
        self.formatter.format(timestamp, record)
    }

    async fn write(&self, batch: &[u8]) -> Disposition {
        self.deliver(batch).await
    }

    fn buffer_settings(&self) -> BufferSettings {
        BufferSettings::default()
    }

    fn multi_workers_ready(&self) -> bool {
        true
    }
}

/// Running totals of delivery outcomes, shared by clones of a sink.
#[derive(Debug, Default)]
pub struct DeliveryStats {
    delivered: AtomicU64,
    retryable: AtomicU64,
    permanent: AtomicU64,
    silently_dropped: AtomicU64,
    bytes_delivered: AtomicU64,
}

impl DeliveryStats {
    pub fn snapshot(&self) -> DeliveryStatsSnapshot {
        DeliveryStatsSnapshot {
            delivered: self.delivered.load(Ordering::Relaxed),
            retryable: self.retryable.load(Ordering::Relaxed),
            permanent: self.permanent.load(Ordering::Relaxed),
            silently_dropped: self.silently_dropped.load(Ordering::Relaxed),
            bytes_delivered: self.bytes_delivered.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryStatsSnapshot {
    pub delivered: u64,
    pub retryable: u64,
    pub permanent: u64,
    /// Batches rejected by ClickHouse and dropped without retry or escalation.
    pub silently_dropped: u64,
    pub bytes_delivered: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn new_validates_config() {
        let config = ClickHouseConfig::new("ch", "");
        assert!(matches!(ClickHouseSink::new(config), Err(ConfigError::MissingField("table"))));
    }

    #[test]
    fn new_rejects_host_that_moves_the_endpoint() {
        let config = ClickHouseConfig::new("ch.local/foo", "events");
        assert!(matches!(
            ClickHouseSink::new(config),
            Err(ConfigError::Invalid { field: "host", .. })
        ));
    }

    #[test]
    fn new_rejects_overflowing_tz_offset() {
        let mut config = ClickHouseConfig::new("ch", "events");
        config.tz_offset = i64::MAX / 2;
        config.datetime_name = Some("dt".into());
        assert!(matches!(
            ClickHouseSink::new(config),
            Err(ConfigError::Invalid { field: "tz_offset", .. })
        ));
    }

    #[test]
    fn format_uses_configured_formatter() {
        let mut config = ClickHouseConfig::new("ch", "events");
        config.tz_offset = 1;
        config.datetime_name = Some("dt".into());
        let sink = ClickHouseSink::new(config).unwrap();

        let mut record = Record::new();
        record.insert("a".into(), json!(1));
        let line = OutputSink::format(&sink, "app.access", 100, record).unwrap();
        assert_eq!(line, "{\"a\":1,\"dt\":160}\n");
    }

    #[test]
    fn advertises_scheduler_contract() {
        let sink = ClickHouseSink::new(ClickHouseConfig::new("ch", "events")).unwrap();
        assert!(sink.multi_workers_ready());
        assert_eq!(sink.buffer_settings(), BufferSettings::default());
        assert_eq!(sink.table(), "events");
        assert_eq!(sink.stats(), DeliveryStatsSnapshot::default());
    }
}
