// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use crate::store::{RejectedLogEventsInfo, StoreError};

/// Errors surfaced by the shipper.
#[derive(Debug, thiserror::Error)]
pub enum ShipError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Log record has an empty stream name")]
    EmptyStreamName,

    #[error("Failed to create {resource}: {source}")]
    Provisioning {
        resource: String,
        #[source]
        source: StoreError,
    },

    #[error("Failed to deliver logs to stream {stream}: {failure}")]
    Delivery {
        stream: String,
        #[source]
        failure: DeliveryFailure,
    },

    #[error("Worker for stream {stream} terminated abnormally: {reason}")]
    Worker { stream: String, reason: String },
}

/// A batch that could not be delivered. Fatal for the owning stream worker.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryFailure {
    #[error("sequence token rejected after retry: {0}")]
    TokenMismatch(#[source] StoreError),

    #[error("store rejected events: {0}")]
    RejectedEvents(RejectedLogEventsInfo),

    #[error(transparent)]
    Transport(StoreError),
}

impl ShipError {
    pub(crate) fn delivery(stream: &str, failure: DeliveryFailure) -> Self {
        ShipError::Delivery {
            stream: stream.to_string(),
            failure,
        }
    }
}
