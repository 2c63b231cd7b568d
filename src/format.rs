use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::SerializationError;
use crate::record::{to_record, Record};

/// Turns one record into one `JSONEachRow` line.
///
/// When `datetime_name` is set, the event timestamp shifted by
/// `tz_offset_minutes` is written into the record under that name before
/// serialization. Everything else passes through untouched.
#[derive(Clone, Debug, Default)]
pub struct RecordFormatter {
    tz_offset_minutes: i64,
    datetime_name: Option<String>,
}

impl RecordFormatter {
    /// An empty `datetime_name` is treated the same as `None`.
    pub fn new(tz_offset_minutes: i64, datetime_name: Option<String>) -> Self {
        Self {
            tz_offset_minutes,
            datetime_name: datetime_name.filter(|name| !name.is_empty()),
        }
    }

    pub fn datetime_name(&self) -> Option<&str> {
        self.datetime_name.as_deref()
    }

    /// Value written into the injected field for an event at `timestamp`,
    /// or `None` if it does not fit in an `i64`.
    pub fn shifted_timestamp(&self, timestamp: i64) -> Option<i64> {
        self.tz_offset_minutes
            .checked_mul(60)
            .and_then(|offset| timestamp.checked_add(offset))
    }

    /// Serialize `record` as a single JSON line terminated by `\n`.
    ///
    /// **Parameters**
    /// - `timestamp`: event time in epoch seconds.
    /// - `record`: the event fields. Only the injected field (if any) is
    ///   added or overwritten; order of the other fields is kept.
    pub fn format(&self, timestamp: i64, mut record: Record) -> Result<String, SerializationError> {
        if let Some(name) = &self.datetime_name {
            let shifted = self.shifted_timestamp(timestamp).ok_or(
                SerializationError::TimestampOverflow {
                    timestamp,
                    tz_offset_minutes: self.tz_offset_minutes,
                },
            )?;
            record.insert(name.clone(), Value::from(shifted));
        }

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');
        Ok(line)
    }

    pub fn format_at(&self, time: DateTime<Utc>, record: Record) -> Result<String, SerializationError> {
        self.format(time.timestamp(), record)
    }

    /// Like [`RecordFormatter::format`] for any value that serializes to a
    /// JSON object.
    pub fn format_serializable<T: Serialize + ?Sized>(
        &self,
        timestamp: i64,
        value: &T,
    ) -> Result<String, SerializationError> {
        self.format(timestamp, to_record(value)?)
    }
}
