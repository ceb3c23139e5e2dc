// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use logship::{LogRecord, LogShipper, ShipperConfig};
use std::sync::Arc;
use std::time::Duration;

use super::mocks::MockLogStore;

pub const LOG_GROUP: &str = "test-group";

pub fn test_config() -> ShipperConfig {
    ShipperConfig {
        log_group: LOG_GROUP.to_string(),
        ..ShipperConfig::default()
    }
}

pub async fn start_shipper(store: &Arc<MockLogStore>, config: ShipperConfig) -> LogShipper {
    LogShipper::new(config, Arc::clone(store) as Arc<dyn logship::LogStore>)
        .await
        .expect("failed to create shipper")
}

pub fn record(stream: &str, message: impl Into<String>) -> LogRecord {
    LogRecord::with_timestamp(stream, 1_700_000_000.5, message)
}

/// A message whose size cost (UTF-8 length + 26) is exactly `cost`.
#[allow(dead_code)]
pub fn message_with_cost(cost: usize) -> String {
    "x".repeat(cost - 26)
}

/// Polls `condition` every 10ms until it holds or `limit` passes.
#[allow(dead_code)]
pub async fn wait_until(limit: Duration, condition: impl Fn() -> bool) -> bool {
    let poll = async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    tokio::time::timeout(limit, poll).await.is_ok()
}
