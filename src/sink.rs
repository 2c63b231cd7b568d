use std::time::Duration;

use async_trait::async_trait;

use crate::disposition::Disposition;
use crate::error::SerializationError;
use crate::record::Record;

/// Chunk length the sink asks for when the scheduler groups by time.
pub const DEFAULT_TIMEKEY: Duration = Duration::from_secs(60 * 60 * 24);

/// Where the scheduler should keep buffered chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Memory,
    File,
}

/// Buffering contract an output expects from the scheduler that drives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BufferSettings {
    pub kind: BufferKind,
    pub chunk_keys: Vec<String>,
    pub timekey: Duration,
    pub flush_at_shutdown: bool,
}

impl Default for BufferSettings {
    fn default() -> Self {
        Self {
            kind: BufferKind::Memory,
            chunk_keys: vec!["time".to_string()],
            timekey: DEFAULT_TIMEKEY,
            flush_at_shutdown: true,
        }
    }
}

/// Output stage driven by an external buffering scheduler.
///
/// The scheduler calls [`OutputSink::format`] once per record, concatenates
/// the lines into a chunk, and hands each chunk to [`OutputSink::write`].
/// It must act on the returned [`Disposition`]:
///
/// - `Success` / `SilentFailure`: release the chunk.
/// - `RetryableFailure`: keep the chunk and schedule another attempt.
/// - `PermanentFailure`: stop retrying and escalate.
#[async_trait]
pub trait OutputSink: Send + Sync {
    /// Serialize one record into one newline-terminated line.
    ///
    /// **Parameters**
    /// - `tag`: routing tag of the record. Outputs may ignore it.
    /// - `timestamp`: event time in epoch seconds.
    /// - `record`: the event fields.
    fn format(&self, tag: &str, timestamp: i64, record: Record) -> Result<String, SerializationError>;

    /// Deliver one chunk of formatted lines.
    ///
    /// The chunk is only borrowed for the duration of the call.
    async fn write(&self, batch: &[u8]) -> Disposition;

    fn buffer_settings(&self) -> BufferSettings {
        BufferSettings::default()
    }

    /// Whether several workers may call [`OutputSink::write`] concurrently.
    fn multi_workers_ready(&self) -> bool {
        false
    }
}
