// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! In-memory log store that enforces the same rules as the remote service:
//! appends need an existing stream and the current sequence token.

use async_trait::async_trait;
use logship::store::{LogStore, PutLogEventsOutput, PutLogEventsRequest, StoreError};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// One `put_log_events` call as seen by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPut {
    pub stream: String,
    pub messages: Vec<String>,
    pub token: Option<String>,
    /// Token handed back on success, `None` for rejected calls.
    pub next_token: Option<String>,
    pub accepted: bool,
}

#[derive(Default)]
struct State {
    groups: HashSet<String>,
    streams: HashSet<(String, String)>,
    expected_tokens: HashMap<String, String>,
    issued: u64,
    attempts: Vec<RecordedPut>,
    put_failures: VecDeque<StoreError>,
    group_failure: Option<StoreError>,
    stream_failure: Option<StoreError>,
    stream_creations: usize,
    stream_gates: HashMap<String, Arc<Notify>>,
    put_gate: Option<Arc<Notify>>,
    puts_in_flight: usize,
    max_puts_in_flight: usize,
}

#[derive(Default)]
pub struct MockLogStore {
    state: Mutex<State>,
}

#[allow(dead_code)]
impl MockLogStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_existing_stream(self, group: &str, stream: &str) -> Self {
        {
            let mut state = self.state.lock().unwrap();
            state.groups.insert(group.to_string());
            state
                .streams
                .insert((group.to_string(), stream.to_string()));
        }
        self
    }

    /// Fails the next append with `error`, before any token check.
    pub fn fail_next_put(&self, error: StoreError) {
        self.state.lock().unwrap().put_failures.push_back(error);
    }

    pub fn fail_next_group_creation(&self, error: StoreError) {
        self.state.lock().unwrap().group_failure = Some(error);
    }

    pub fn fail_next_stream_creation(&self, error: StoreError) {
        self.state.lock().unwrap().stream_failure = Some(error);
    }

    /// Pretends another writer appended to `stream`.
    pub fn set_expected_token(&self, stream: &str, token: &str) {
        self.state
            .lock()
            .unwrap()
            .expected_tokens
            .insert(stream.to_string(), token.to_string());
    }

    /// Makes the creation of `stream` wait until the returned gate is notified.
    pub fn hold_stream_creation(&self, stream: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state
            .lock()
            .unwrap()
            .stream_gates
            .insert(stream.to_string(), Arc::clone(&gate));
        gate
    }

    /// Makes the next append wait until the returned gate is notified.
    pub fn hold_next_put(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.state.lock().unwrap().put_gate = Some(Arc::clone(&gate));
        gate
    }

    pub fn puts_in_flight(&self) -> usize {
        self.state.lock().unwrap().puts_in_flight
    }

    /// Highest number of appends that were running at the same time.
    pub fn max_puts_in_flight(&self) -> usize {
        self.state.lock().unwrap().max_puts_in_flight
    }

    pub fn attempts(&self) -> Vec<RecordedPut> {
        self.state.lock().unwrap().attempts.clone()
    }

    /// Accepted appends for `stream`, in arrival order.
    pub fn puts_for(&self, stream: &str) -> Vec<RecordedPut> {
        self.attempts()
            .into_iter()
            .filter(|put| put.accepted && put.stream == stream)
            .collect()
    }

    pub fn batches_for(&self, stream: &str) -> Vec<Vec<String>> {
        self.puts_for(stream)
            .into_iter()
            .map(|put| put.messages)
            .collect()
    }

    pub fn messages_for(&self, stream: &str) -> Vec<String> {
        self.batches_for(stream).into_iter().flatten().collect()
    }

    pub fn stream_creations(&self) -> usize {
        self.state.lock().unwrap().stream_creations
    }

    pub fn has_stream(&self, group: &str, stream: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .streams
            .contains(&(group.to_string(), stream.to_string()))
    }
}

fn already_exists(what: &str) -> StoreError {
    StoreError::service(
        "ResourceAlreadyExistsException",
        format!("The specified {what} already exists"),
    )
}

#[async_trait]
impl LogStore for MockLogStore {
    async fn create_log_group(&self, log_group: &str) -> Result<(), StoreError> {
        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.group_failure.take() {
            return Err(error);
        }
        if !state.groups.insert(log_group.to_string()) {
            return Err(already_exists("log group"));
        }
        Ok(())
    }

    async fn create_log_stream(&self, log_group: &str, log_stream: &str) -> Result<(), StoreError> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.stream_creations += 1;
            state.stream_gates.remove(log_stream)
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        if let Some(error) = state.stream_failure.take() {
            return Err(error);
        }
        if !state
            .streams
            .insert((log_group.to_string(), log_stream.to_string()))
        {
            return Err(already_exists("log stream"));
        }
        Ok(())
    }

    async fn put_log_events(
        &self,
        request: &PutLogEventsRequest,
    ) -> Result<PutLogEventsOutput, StoreError> {
        let gate = {
            let mut state = self.state.lock().unwrap();
            state.puts_in_flight += 1;
            state.max_puts_in_flight = state.max_puts_in_flight.max(state.puts_in_flight);
            state.put_gate.take()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let mut state = self.state.lock().unwrap();
        state.puts_in_flight -= 1;
        let mut put = RecordedPut {
            stream: request.log_stream_name.clone(),
            messages: request
                .log_events
                .iter()
                .map(|event| event.message.clone())
                .collect(),
            token: request.sequence_token.clone(),
            next_token: None,
            accepted: false,
        };

        let result = if let Some(error) = state.put_failures.pop_front() {
            Err(error)
        } else if !state.streams.contains(&(
            request.log_group_name.clone(),
            request.log_stream_name.clone(),
        )) {
            Err(StoreError::service(
                "ResourceNotFoundException",
                "The specified log stream does not exist.",
            ))
        } else {
            let expected = state.expected_tokens.get(&request.log_stream_name).cloned();
            if request.sequence_token != expected {
                Err(StoreError::service(
                    "InvalidSequenceTokenException",
                    format!(
                        "The given sequenceToken is invalid. The next expected sequence token is: {}",
                        expected.as_deref().unwrap_or("null")
                    ),
                ))
            } else {
                state.issued += 1;
                let next = state.issued.to_string();
                state
                    .expected_tokens
                    .insert(request.log_stream_name.clone(), next.clone());
                put.next_token = Some(next.clone());
                put.accepted = true;
                Ok(PutLogEventsOutput {
                    next_sequence_token: Some(next),
                    rejected_log_events_info: None,
                })
            }
        };

        state.attempts.push(put);
        result
    }
}
