// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Contract of the remote log-stream store.
//!
//! The store exposes three calls: create a log group, create a log stream in
//! a group, and append an ordered list of events to a stream. Appends carry
//! the sequence token returned by the previous append on that stream.
//! [`crate::cloudwatch::CloudWatchLogsClient`] implements it over HTTP; tests
//! implement it in memory.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use tracing::debug;

use crate::errors::ShipError;
use crate::record::QueuedMessage;

#[async_trait]
pub trait LogStore: Send + Sync {
    async fn create_log_group(&self, log_group: &str) -> Result<(), StoreError>;

    async fn create_log_stream(&self, log_group: &str, log_stream: &str)
        -> Result<(), StoreError>;

    /// Appends `request.log_events` to the stream, in order.
    async fn put_log_events(
        &self,
        request: &PutLogEventsRequest,
    ) -> Result<PutLogEventsOutput, StoreError>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PutLogEventsRequest {
    pub log_group_name: String,
    pub log_stream_name: String,
    pub log_events: Vec<QueuedMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PutLogEventsOutput {
    #[serde(default)]
    pub next_sequence_token: Option<String>,
    #[serde(default)]
    pub rejected_log_events_info: Option<RejectedLogEventsInfo>,
}

/// Present in an append response when some events were not accepted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectedLogEventsInfo {
    #[serde(default)]
    pub too_new_log_event_start_index: Option<i64>,
    #[serde(default)]
    pub too_old_log_event_end_index: Option<i64>,
    #[serde(default)]
    pub expired_log_event_end_index: Option<i64>,
}

impl fmt::Display for RejectedLogEventsInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "too_new_start={:?}, too_old_end={:?}, expired_end={:?}",
            self.too_new_log_event_start_index,
            self.too_old_log_event_end_index,
            self.expired_log_event_end_index
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The store answered with an error code.
    #[error("{code}: {message}")]
    Service { code: String, message: String },

    /// The call did not produce a store answer (network, decoding, ...).
    #[error("transport error: {0}")]
    Transport(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    AlreadyExists,
    DataAlreadyAccepted,
    InvalidSequenceToken,
    Other,
}

impl StoreError {
    pub fn service(code: impl Into<String>, message: impl Into<String>) -> Self {
        StoreError::Service {
            code: code.into(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn kind(&self) -> StoreErrorKind {
        let StoreError::Service { code, .. } = self else {
            return StoreErrorKind::Other;
        };
        // "com.amazonaws.logs#InvalidSequenceTokenException" and
        // "InvalidSequenceToken" name the same error.
        let code = code.rsplit('#').next().unwrap_or_default();
        let code = code.strip_suffix("Exception").unwrap_or(code);
        match code {
            "ResourceAlreadyExists" => StoreErrorKind::AlreadyExists,
            "DataAlreadyAccepted" => StoreErrorKind::DataAlreadyAccepted,
            "InvalidSequenceToken" => StoreErrorKind::InvalidSequenceToken,
            _ => StoreErrorKind::Other,
        }
    }

    /// True for the errors whose message carries the token to retry with.
    #[must_use]
    pub fn is_stale_token(&self) -> bool {
        matches!(
            self.kind(),
            StoreErrorKind::DataAlreadyAccepted | StoreErrorKind::InvalidSequenceToken
        )
    }

    /// The token the store expects next: the text after the last space of
    /// the error message. `None` when there is nothing to extract.
    #[must_use]
    pub fn expected_sequence_token(&self) -> Option<&str> {
        let StoreError::Service { message, .. } = self else {
            return None;
        };
        message.rsplit(' ').next().filter(|token| !token.is_empty())
    }
}

/// Runs a create call, treating "already exists" as success.
pub async fn create_if_absent<F>(resource: &str, create: F) -> Result<(), ShipError>
where
    F: Future<Output = Result<(), StoreError>>,
{
    match create.await {
        Ok(()) => {
            debug!("Created {resource}");
            Ok(())
        }
        Err(e) if e.kind() == StoreErrorKind::AlreadyExists => {
            debug!("{resource} already exists");
            Ok(())
        }
        Err(source) => Err(ShipError::Provisioning {
            resource: resource.to_string(),
            source,
        }),
    }
}
