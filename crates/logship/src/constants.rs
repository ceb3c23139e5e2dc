// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Limits imposed by the CloudWatch Logs `PutLogEvents` API.
//!
//! The service computes a batch size as the sum of all event messages in
//! UTF-8, plus a fixed overhead per log event. Batches over either limit are
//! rejected outright, so the defaults below are also the ceilings.

use std::time::Duration;

/// Fixed per-event overhead, in bytes, added to the message length when the
/// remote store sizes a batch.
pub const EVENT_OVERHEAD_BYTES: usize = 26;

/// Maximum summed size cost of a single `PutLogEvents` batch.
///
/// # Value: 1MB (1,048,576 bytes)
pub const MAX_BATCH_SIZE_BYTES: usize = 1_024 * 1_024;

/// Maximum number of log events in a single `PutLogEvents` batch.
pub const MAX_BATCH_COUNT: usize = 10_000;

/// Default maximum age of a batch before it is sent.
pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(60);

/// Default request timeout for the HTTP store client.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default log group, the crate name.
pub const DEFAULT_LOG_GROUP: &str = env!("CARGO_PKG_NAME");
