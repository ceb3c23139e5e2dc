// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::dispatcher::LogShipper;
use crate::errors::ShipError;
use crate::record::LogRecord;

/// Destination for formatted log records.
///
/// Logging-framework adapters write through this trait so they do not depend
/// on how records are batched or delivered.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn write(&self, record: LogRecord) -> Result<(), ShipError>;

    /// Returns once everything written so far has been delivered.
    async fn flush(&self) -> Result<(), ShipError>;
}

#[async_trait]
impl Sink for LogShipper {
    async fn write(&self, record: LogRecord) -> Result<(), ShipError> {
        self.emit(record).await
    }

    async fn flush(&self) -> Result<(), ShipError> {
        LogShipper::flush(self).await
    }
}
