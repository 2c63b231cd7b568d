use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Logging setup for processes that embed the sink.
///
/// **Fields**
/// - `default_directive`: filter used when `RUST_LOG` is not set.
/// - `ansi`: colorize console output.
/// - `with_target`: print the module path of every event.
#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub default_directive: String,
    pub ansi: bool,
    pub with_target: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            default_directive: "info".to_string(),
            ansi: true,
            with_target: true,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum InitError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("global subscriber already set: {0}")]
    AlreadySet(#[from] tracing_subscriber::util::TryInitError),
}

/// Build the filter from `RUST_LOG`, falling back to `default_directive`.
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter, InitError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => Ok(EnvFilter::try_new(&config.default_directive)?),
    }
}

/// Install a global `tracing` subscriber printing to stdout.
///
/// Delivery outcomes are logged by the sink at `debug` (success),
/// `warn` (retryable) and `error` (permanent or dropped), so the default
/// `info` level already shows every failure.
pub fn init_logging(config: LoggingConfig) -> Result<(), InitError> {
    let filter = env_filter(&config)?;
    let fmt_layer = fmt::layer()
        .with_ansi(config.ansi)
        .with_target(config.with_target);

    Registry::default().with(filter).with(fmt_layer).try_init()?;
    Ok(())
}

/// Equivalent to [`init_logging`] with [`LoggingConfig::default`].
pub fn init_default_logging() -> Result<(), InitError> {
    init_logging(LoggingConfig::default())
}
