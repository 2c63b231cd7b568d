//! Read JSON objects from stdin (one per line) and forward them to
//! ClickHouse in batches.
//!
//! Configuration comes from the `LOG_SINK_*` environment variables, e.g.
//!
//! ```text
//! LOG_SINK_CLICKHOUSE_HOST=127.0.0.1 LOG_SINK_CLICKHOUSE_TABLE=events \
//!     cargo run --example stdin_forward < events.ndjson
//! ```

use std::process::ExitCode;

use chrono::Utc;
use clickhouse_log_sink::env::env_or;
use clickhouse_log_sink::init::init_default_logging;
use clickhouse_log_sink::{ClickHouseConfig, ClickHouseSink, Disposition, OutputSink, Record};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{sleep, Duration};
use tracing::{error, info, warn};

const BATCH_SIZE_ENV: &str = "STDIN_FORWARD_BATCH_SIZE";

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = init_default_logging() {
        eprintln!("failed to initialize logging: {}", e);
    }

    let config = match ClickHouseConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let sink = match ClickHouseSink::connect(config).await {
        Ok(sink) => sink,
        Err(e) => {
            error!(error = %e, "ClickHouse is not reachable");
            return ExitCode::FAILURE;
        }
    };
    info!(endpoint = %sink.endpoint(), table = sink.table(), "connected");

    let batch_size: usize = env_or(BATCH_SIZE_ENV, "500").parse().unwrap_or(500).max(1);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut batch = String::new();
    let mut pending = 0usize;

    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                error!(error = %e, "failed to read stdin");
                return ExitCode::FAILURE;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let record: Record = match serde_json::from_str(&line) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "skipping line that is not a JSON object");
                continue;
            }
        };

        match sink.format("stdin", Utc::now().timestamp(), record) {
            Ok(formatted) => {
                batch.push_str(&formatted);
                pending += 1;
            }
            Err(e) => warn!(error = %e, "skipping unserializable record"),
        }

        if pending >= batch_size {
            if !flush(&sink, &mut batch).await {
                return ExitCode::FAILURE;
            }
            pending = 0;
        }
    }

    if !batch.is_empty() && !flush(&sink, &mut batch).await {
        return ExitCode::FAILURE;
    }

    let stats = sink.stats();
    info!(
        delivered = stats.delivered,
        retried = stats.retryable,
        dropped = stats.silently_dropped,
        "stdin closed"
    );
    ExitCode::SUCCESS
}

/// Deliver `batch` until it is handled. Returns `false` on a permanent failure.
async fn flush(sink: &ClickHouseSink, batch: &mut String) -> bool {
    let mut backoff = Duration::from_millis(100);
    let max_backoff = Duration::from_secs(10);

    loop {
        match sink.write(batch.as_bytes()).await {
            Disposition::Success | Disposition::SilentFailure(_) => {
                batch.clear();
                return true;
            }
            Disposition::RetryableFailure(_) => {
                sleep(backoff).await;
                backoff = std::cmp::min(backoff * 2, max_backoff);
            }
            Disposition::PermanentFailure(reason) => {
                error!(%reason, "stopping: ClickHouse rejected a batch");
                return false;
            }
        }
    }
}
