// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, warn};

use crate::errors::{DeliveryFailure, ShipError};
use crate::record::QueuedMessage;
use crate::sequence::SequenceTokenStore;
use crate::store::{LogStore, PutLogEventsOutput, PutLogEventsRequest, StoreError};

/// Sends batches to the store and keeps each stream's token chain.
///
/// Callers must not submit for the same stream concurrently.
#[derive(Clone)]
pub struct Submitter {
    store: Arc<dyn LogStore>,
    log_group: Arc<str>,
    tokens: Arc<SequenceTokenStore>,
}

impl Submitter {
    pub fn new(
        store: Arc<dyn LogStore>,
        log_group: impl Into<Arc<str>>,
        tokens: Arc<SequenceTokenStore>,
    ) -> Self {
        Self {
            store,
            log_group: log_group.into(),
            tokens,
        }
    }

    pub fn tokens(&self) -> &SequenceTokenStore {
        &self.tokens
    }

    /// Appends `events` to `stream_name` and advances its sequence token.
    ///
    /// A stale-token answer is retried once with the token the store names in
    /// its error message. Anything else, including a second failure, is fatal.
    pub async fn submit(
        &self,
        stream_name: &str,
        events: Vec<QueuedMessage>,
    ) -> Result<(), ShipError> {
        let n_events = events.len();
        debug!("Sending batch of {n_events} events to stream {stream_name}");
        let time = Instant::now();

        let mut request = PutLogEventsRequest {
            log_group_name: self.log_group.to_string(),
            log_stream_name: stream_name.to_string(),
            log_events: events,
            sequence_token: self.tokens.get(stream_name),
        };

        let output = match self.store.put_log_events(&request).await {
            Ok(output) => output,
            Err(e) if e.is_stale_token() => {
                self.retry_with_expected_token(&mut request, e).await?
            }
            Err(e) => {
                return Err(ShipError::delivery(
                    stream_name,
                    DeliveryFailure::Transport(e),
                ))
            }
        };

        if let Some(rejected) = output.rejected_log_events_info {
            error!("Store rejected events for stream {stream_name}: {rejected}");
            return Err(ShipError::delivery(
                stream_name,
                DeliveryFailure::RejectedEvents(rejected),
            ));
        }

        self.tokens.advance(stream_name, output.next_sequence_token);
        debug!(
            "Sent batch of {n_events} events to stream {stream_name} in {} ms",
            time.elapsed().as_millis()
        );
        Ok(())
    }

    async fn retry_with_expected_token(
        &self,
        request: &mut PutLogEventsRequest,
        stale: StoreError,
    ) -> Result<PutLogEventsOutput, ShipError> {
        let stream_name = request.log_stream_name.clone();
        let Some(expected) = stale.expected_sequence_token() else {
            return Err(ShipError::delivery(
                &stream_name,
                DeliveryFailure::TokenMismatch(stale),
            ));
        };
        // A brand-new stream reports "null" as the expected token.
        request.sequence_token = (expected != "null").then(|| expected.to_string());
        warn!(
            "Sequence token for stream {stream_name} was stale, retrying with {:?}",
            request.sequence_token
        );

        self.store.put_log_events(request).await.map_err(|e| {
            let failure = if e.is_stale_token() {
                DeliveryFailure::TokenMismatch(e)
            } else {
                DeliveryFailure::Transport(e)
            };
            ShipError::delivery(&stream_name, failure)
        })
    }
}
