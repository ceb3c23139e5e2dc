// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::constants::EVENT_OVERHEAD_BYTES;

/// A log record as handed over by the producer.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Name of the log stream the record belongs to.
    pub stream_name: String,
    /// Creation time in fractional seconds since the Unix epoch.
    pub timestamp: f64,
    pub message: String,
}

impl LogRecord {
    /// Creates a record stamped with the current wall-clock time.
    pub fn new(stream_name: impl Into<String>, message: impl Into<String>) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        Self {
            stream_name: stream_name.into(),
            timestamp,
            message: message.into(),
        }
    }

    pub fn with_timestamp(
        stream_name: impl Into<String>,
        timestamp: f64,
        message: impl Into<String>,
    ) -> Self {
        Self {
            stream_name: stream_name.into(),
            timestamp,
            message: message.into(),
        }
    }
}

/// A message waiting in a stream queue, already in wire shape.
///
/// Serializes as `{"timestamp": <ms>, "message": <text>}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueuedMessage {
    #[serde(rename = "timestamp")]
    pub timestamp_ms: i64,
    pub message: String,
}

impl QueuedMessage {
    pub fn new(timestamp_ms: i64, message: impl Into<String>) -> Self {
        Self {
            timestamp_ms,
            message: message.into(),
        }
    }

    /// Bytes this message counts for against the batch size limit.
    #[must_use]
    pub fn size_cost(&self) -> usize {
        self.message.len() + EVENT_OVERHEAD_BYTES
    }
}

impl From<LogRecord> for QueuedMessage {
    fn from(record: LogRecord) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let timestamp_ms = (record.timestamp * 1000.0) as i64;
        Self {
            timestamp_ms,
            message: record.message,
        }
    }
}
