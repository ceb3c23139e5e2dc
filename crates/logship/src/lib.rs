// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Batched log shipping to CloudWatch Logs style stores.
//!
//! Records handed to [`LogShipper::emit`] are queued per log stream. One
//! worker per stream groups them into batches that respect the store's size,
//! count and age limits, and appends each batch with the stream's current
//! sequence token. [`LogShipper::flush`] drains every queue.

#![cfg_attr(not(test), deny(clippy::panic))]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]
#![cfg_attr(not(test), deny(clippy::todo))]
#![cfg_attr(not(test), deny(clippy::unimplemented))]

pub mod batch;
pub mod cloudwatch;
pub mod config;
pub mod constants;
pub mod dispatcher;
pub mod errors;
mod flusher;
pub mod record;
pub mod sequence;
pub mod sink;
pub mod store;
pub mod submitter;
mod worker;

pub use cloudwatch::CloudWatchLogsClient;
pub use config::{CloudWatchConfig, ShipperConfig};
pub use dispatcher::LogShipper;
pub use errors::{DeliveryFailure, ShipError};
pub use record::{LogRecord, QueuedMessage};
pub use sink::Sink;
pub use store::{LogStore, StoreError};
