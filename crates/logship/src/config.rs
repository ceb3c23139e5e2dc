// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::env;
use std::time::Duration;
use tracing::warn;

use crate::constants::{
    DEFAULT_LOG_GROUP, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SEND_INTERVAL, MAX_BATCH_COUNT,
    MAX_BATCH_SIZE_BYTES,
};
use crate::errors::ShipError;

/// Configuration of the batching engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ShipperConfig {
    /// Log group every stream is created in
    pub log_group: String,
    /// Queue messages per stream and send them in batches. When false, every
    /// record is submitted synchronously as a batch of one.
    pub use_queues: bool,
    /// Maximum time a batch is held before it is sent
    pub send_interval: Duration,
    /// Maximum summed size cost of a batch, in bytes
    pub max_batch_size: usize,
    /// Maximum number of messages in a batch
    pub max_batch_count: usize,
}

impl Default for ShipperConfig {
    fn default() -> Self {
        Self {
            log_group: DEFAULT_LOG_GROUP.to_string(),
            use_queues: true,
            send_interval: DEFAULT_SEND_INTERVAL,
            max_batch_size: MAX_BATCH_SIZE_BYTES,
            max_batch_count: MAX_BATCH_COUNT,
        }
    }
}

impl ShipperConfig {
    /// Create configuration from `LOGSHIP_*` environment variables, falling
    /// back to defaults for unset or unparsable values.
    pub fn from_env() -> Result<Self, ShipError> {
        let defaults = Self::default();

        let log_group = env::var("LOGSHIP_LOG_GROUP").unwrap_or(defaults.log_group);
        let use_queues = env::var("LOGSHIP_USE_QUEUES")
            .map(|val| val.to_lowercase() != "false")
            .unwrap_or(defaults.use_queues);
        let send_interval = env::var("LOGSHIP_SEND_INTERVAL")
            .ok()
            .and_then(|secs| secs.parse::<f64>().ok())
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .unwrap_or(defaults.send_interval);
        let max_batch_size = env::var("LOGSHIP_MAX_BATCH_SIZE")
            .ok()
            .and_then(|size| size.parse::<usize>().ok())
            .unwrap_or(defaults.max_batch_size);
        let max_batch_count = env::var("LOGSHIP_MAX_BATCH_COUNT")
            .ok()
            .and_then(|count| count.parse::<usize>().ok())
            .unwrap_or(defaults.max_batch_count);

        let config = Self {
            log_group,
            use_queues,
            send_interval,
            max_batch_size,
            max_batch_count,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ShipError> {
        if self.log_group.trim().is_empty() {
            return Err(ShipError::InvalidConfig(
                "log_group cannot be empty".to_string(),
            ));
        }
        if self.send_interval.is_zero() {
            return Err(ShipError::InvalidConfig(
                "send_interval must be greater than 0".to_string(),
            ));
        }
        if self.max_batch_size == 0 {
            return Err(ShipError::InvalidConfig(
                "max_batch_size must be greater than 0".to_string(),
            ));
        }
        if self.max_batch_count == 0 {
            return Err(ShipError::InvalidConfig(
                "max_batch_count must be greater than 0".to_string(),
            ));
        }

        // Allowed, but the store will reject batches that grow this large.
        if self.max_batch_size > MAX_BATCH_SIZE_BYTES {
            warn!(
                "max_batch_size {} exceeds the store limit of {} bytes",
                self.max_batch_size, MAX_BATCH_SIZE_BYTES
            );
        }
        if self.max_batch_count > MAX_BATCH_COUNT {
            warn!(
                "max_batch_count {} exceeds the store limit of {} events",
                self.max_batch_count, MAX_BATCH_COUNT
            );
        }

        Ok(())
    }
}

/// Connection settings for [`crate::cloudwatch::CloudWatchLogsClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudWatchConfig {
    /// Base URL of the CloudWatch Logs endpoint, e.g. `https://logs.us-east-1.amazonaws.com`
    pub endpoint: String,
    pub timeout: Duration,
    pub https_proxy: Option<String>,
}

impl CloudWatchConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
            https_proxy: None,
        }
    }

    /// Reads `LOGSHIP_ENDPOINT` (or the regional endpoint derived from
    /// `AWS_REGION`), `LOGSHIP_TIMEOUT` and `HTTPS_PROXY`.
    pub fn from_env() -> Result<Self, ShipError> {
        let endpoint = env::var("LOGSHIP_ENDPOINT")
            .ok()
            .or_else(|| {
                env::var("AWS_REGION")
                    .ok()
                    .map(|region| format!("https://logs.{region}.amazonaws.com"))
            })
            .ok_or_else(|| {
                ShipError::InvalidConfig(
                    "neither LOGSHIP_ENDPOINT nor AWS_REGION is set".to_string(),
                )
            })?;
        let timeout = env::var("LOGSHIP_TIMEOUT")
            .ok()
            .and_then(|secs| secs.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT);
        let https_proxy = env::var("LOGSHIP_PROXY_HTTPS")
            .or_else(|_| env::var("HTTPS_PROXY"))
            .ok();

        Ok(Self {
            endpoint,
            timeout,
            https_proxy,
        })
    }
}
