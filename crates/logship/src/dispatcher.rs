// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Entry point of the shipper: routes records to per-stream workers.
//!
//! The registry of streams is only write-locked to insert a stream, to
//! replace a stopped worker, or to close workers on flush. Creating the remote
//! stream happens before that, outside the registry lock. Steady-state emits
//! take the read lock and push onto the stream's queue.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::batch::BatchLimits;
use crate::config::ShipperConfig;
use crate::errors::ShipError;
use crate::record::{LogRecord, QueuedMessage};
use crate::sequence::SequenceTokenStore;
use crate::store::{create_if_absent, LogStore};
use crate::submitter::Submitter;
use crate::worker::{StreamWorker, WorkerHandle};

/// Registry entry for one remote log stream.
#[derive(Debug, Default)]
pub(crate) struct StreamState {
    /// Serializes submissions for the stream across worker generations and
    /// synchronous emits.
    pub(crate) lane: Arc<Mutex<()>>,
    /// Running worker, `None` until the first queued emit and after a flush.
    pub(crate) worker: Option<WorkerHandle>,
    /// Workers that stopped on a failure and were replaced before a flush
    /// collected their result.
    pub(crate) retired: Vec<JoinHandle<Result<(), ShipError>>>,
}

/// Ships log records to a remote log-stream store.
///
/// Dropping the shipper closes every stream queue; running workers still send
/// what they hold and then exit. Call [`LogShipper::flush`] to wait for that.
pub struct LogShipper {
    config: ShipperConfig,
    store: Arc<dyn LogStore>,
    submitter: Submitter,
    /// Remote stream creation, once per stream. An uninitialized cell means
    /// the stream was never created or the last attempt failed.
    provisioned: Mutex<HashMap<String, Arc<OnceCell<()>>>>,
    pub(crate) streams: RwLock<HashMap<String, StreamState>>,
}

impl LogShipper {
    /// Validates `config` and creates the log group if it does not exist.
    pub async fn new(config: ShipperConfig, store: Arc<dyn LogStore>) -> Result<Self, ShipError> {
        config.validate()?;
        create_if_absent(
            &format!("log group {}", config.log_group),
            store.create_log_group(&config.log_group),
        )
        .await?;

        let submitter = Submitter::new(
            Arc::clone(&store),
            config.log_group.as_str(),
            Arc::new(SequenceTokenStore::new()),
        );
        Ok(Self {
            config,
            store,
            submitter,
            provisioned: Mutex::new(HashMap::new()),
            streams: RwLock::new(HashMap::new()),
        })
    }

    /// Hands a record over for delivery.
    ///
    /// With queues enabled this returns as soon as the record is queued and
    /// never reports delivery errors; those surface from [`LogShipper::flush`].
    /// Without queues the record is sent as a batch of one before returning.
    /// The first record of a stream creates the remote stream.
    pub async fn emit(&self, record: LogRecord) -> Result<(), ShipError> {
        if record.stream_name.is_empty() {
            return Err(ShipError::EmptyStreamName);
        }
        let stream_name = record.stream_name.clone();
        let message = QueuedMessage::from(record);

        if !self.config.use_queues {
            return self.submit_now(&stream_name, message).await;
        }

        let (message, known) = {
            let streams = self.streams.read().await;
            match streams.get(&stream_name) {
                Some(StreamState {
                    worker: Some(worker),
                    ..
                }) => match worker.send(message) {
                    Ok(()) => return Ok(()),
                    Err(message) => (message, true),
                },
                Some(_) => (message, true),
                None => (message, false),
            }
        };
        if !known {
            self.provision(&stream_name).await?;
        }

        let mut streams = self.streams.write().await;
        let state = streams.entry(stream_name.clone()).or_default();
        let worker = match state.worker.take() {
            Some(worker) if !worker.is_stopped() => worker,
            previous => {
                if let Some(stopped) = previous {
                    warn!("Worker for stream {stream_name} had stopped, starting a new one");
                    state.retired.push(stopped.close());
                }
                StreamWorker::spawn(
                    &stream_name,
                    self.submitter.clone(),
                    BatchLimits::from(&self.config),
                    Arc::clone(&state.lane),
                )
            }
        };
        let sent = worker.send(message);
        state.worker = Some(worker);
        sent.map_err(|_| ShipError::Worker {
            stream: stream_name,
            reason: "worker stopped before receiving its first message".to_string(),
        })
    }

    /// Names of the streams created so far.
    pub async fn stream_names(&self) -> Vec<String> {
        self.streams.read().await.keys().cloned().collect()
    }

    async fn submit_now(&self, stream_name: &str, message: QueuedMessage) -> Result<(), ShipError> {
        let known = self
            .streams
            .read()
            .await
            .get(stream_name)
            .map(|state| Arc::clone(&state.lane));
        let lane = match known {
            Some(lane) => lane,
            None => {
                self.provision(stream_name).await?;
                let mut streams = self.streams.write().await;
                Arc::clone(&streams.entry(stream_name.to_string()).or_default().lane)
            }
        };

        let _lane = lane.lock().await;
        self.submitter.submit(stream_name, vec![message]).await
    }

    /// Creates the remote stream and starts its token chain, once per stream.
    ///
    /// Concurrent callers for the same stream share one creation call. A
    /// failed creation is retried by the next caller.
    async fn provision(&self, stream_name: &str) -> Result<(), ShipError> {
        let cell = {
            let mut provisioned = self.provisioned.lock().await;
            Arc::clone(provisioned.entry(stream_name.to_string()).or_default())
        };
        cell.get_or_try_init(|| async {
            create_if_absent(
                &format!("log stream {stream_name}"),
                self.store
                    .create_log_stream(&self.config.log_group, stream_name),
            )
            .await?;
            self.submitter.tokens().register(stream_name);
            debug!("Registered stream {stream_name}");
            Ok::<(), ShipError>(())
        })
        .await?;
        Ok(())
    }
}
