// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Bounded accumulation of queued messages for one stream.
//!
//! A batch closes when one of three limits is reached:
//! 1. **Count limit**: it already holds `max_count` messages
//! 2. **Size limit**: the next message would push the summed size cost over `max_size`
//! 3. **Age limit**: `send_interval` has passed since the batch was opened
//!
//! The first message of a batch is always accepted, so a message whose own
//! size cost exceeds `max_size` travels alone instead of being dropped.

use std::time::Duration;
use tokio::time::Instant;
use tracing::warn;

use crate::config::ShipperConfig;
use crate::record::QueuedMessage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchLimits {
    pub max_size: usize,
    pub max_count: usize,
    pub send_interval: Duration,
}

impl From<&ShipperConfig> for BatchLimits {
    fn from(config: &ShipperConfig) -> Self {
        Self {
            max_size: config.max_batch_size,
            max_count: config.max_batch_count,
            send_interval: config.send_interval,
        }
    }
}

#[derive(Debug)]
pub struct Batch {
    limits: BatchLimits,
    events: Vec<QueuedMessage>,
    size: usize,
    opened_at: Instant,
}

impl Batch {
    pub fn new(limits: BatchLimits) -> Self {
        Self {
            limits,
            events: Vec::new(),
            size: 0,
            opened_at: Instant::now(),
        }
    }

    /// Whether `message` can join this batch without breaking a limit.
    #[must_use]
    pub fn fits(&self, message: &QueuedMessage) -> bool {
        if self.events.is_empty() {
            return true;
        }
        self.events.len() < self.limits.max_count
            && self.size + message.size_cost() <= self.limits.max_size
    }

    pub fn push(&mut self, message: QueuedMessage) {
        let cost = message.size_cost();
        if cost > self.limits.max_size {
            warn!(
                "Log event size cost {} exceeds max_batch_size {}, sending it alone",
                cost, self.limits.max_size
            );
        }
        self.size += cost;
        self.events.push(message);
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Instant at which the batch must be sent.
    #[must_use]
    pub fn deadline(&self) -> Instant {
        self.opened_at + self.limits.send_interval
    }

    /// Drains the messages, leaving an empty batch behind.
    pub fn take(&mut self) -> Vec<QueuedMessage> {
        self.size = 0;
        std::mem::take(&mut self.events)
    }

    /// Restarts the age clock.
    pub fn reopen(&mut self) {
        self.opened_at = Instant::now();
    }
}
