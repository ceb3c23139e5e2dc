// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Per-stream batching worker.
//!
//! Each stream gets one worker task that owns the receiving end of the
//! stream's queue:
//!
//! ```text
//!    ┌──────────────┐
//!    │ WorkerHandle │  (held by the dispatcher registry)
//!    └──────┬───────┘
//!           │ QueuedMessage via unbounded channel
//!           v
//!    ┌──────────────┐
//!    │ StreamWorker │  accumulate → submit → accumulate ...
//!    └──────┬───────┘
//!           │ one batch at a time
//!           v
//!    ┌──────────────┐
//!    │  Submitter   │
//!    └──────────────┘
//! ```
//!
//! Closing the channel is the stop signal: the worker drains everything that
//! was queued before the close, sends the last batch and exits. A delivery
//! failure stops the worker early; whatever is still queued is dropped.

use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::timeout_at;
use tracing::{debug, debug_span, error, Instrument};

use crate::batch::{Batch, BatchLimits};
use crate::errors::ShipError;
use crate::record::QueuedMessage;
use crate::submitter::Submitter;

/// Sending side of a running stream worker.
#[derive(Debug)]
pub(crate) struct WorkerHandle {
    tx: mpsc::UnboundedSender<QueuedMessage>,
    task: JoinHandle<Result<(), ShipError>>,
}

impl WorkerHandle {
    /// Queues a message, handing it back if the worker has stopped.
    pub(crate) fn send(&self, message: QueuedMessage) -> Result<(), QueuedMessage> {
        self.tx.send(message).map_err(|e| e.0)
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.tx.is_closed()
    }

    /// Closes the queue and returns the task to await the drain on.
    pub(crate) fn close(self) -> JoinHandle<Result<(), ShipError>> {
        drop(self.tx);
        self.task
    }
}

pub(crate) struct StreamWorker {
    stream_name: String,
    rx: mpsc::UnboundedReceiver<QueuedMessage>,
    submitter: Submitter,
    batch: Batch,
}

impl StreamWorker {
    /// Spawns a worker for `stream_name`.
    ///
    /// The worker holds `lane` for its whole life, so a replacement worker for
    /// the same stream only starts reading once its predecessor has finished
    /// its last submission.
    pub(crate) fn spawn(
        stream_name: &str,
        submitter: Submitter,
        limits: BatchLimits,
        lane: Arc<Mutex<()>>,
    ) -> WorkerHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = StreamWorker {
            stream_name: stream_name.to_string(),
            rx,
            submitter,
            batch: Batch::new(limits),
        };
        let span = debug_span!("stream_worker", stream = %stream_name);
        let task = tokio::spawn(
            async move {
                let _lane = lane.lock_owned().await;
                worker.run().await
            }
            .instrument(span),
        );
        WorkerHandle { tx, task }
    }

    pub(crate) async fn run(mut self) -> Result<(), ShipError> {
        debug!("Stream worker for {} started", self.stream_name);
        self.batch.reopen();

        loop {
            match timeout_at(self.batch.deadline(), self.rx.recv()).await {
                Ok(Some(message)) => {
                    if !self.batch.fits(&message) {
                        self.submit_batch().await?;
                    }
                    self.batch.push(message);
                }
                Ok(None) => {
                    if !self.batch.is_empty() {
                        self.submit_batch().await?;
                    }
                    break;
                }
                Err(_elapsed) => {
                    if self.batch.is_empty() {
                        self.batch.reopen();
                    } else {
                        self.submit_batch().await?;
                    }
                }
            }
        }

        debug!("Stream worker for {} stopped", self.stream_name);
        Ok(())
    }

    async fn submit_batch(&mut self) -> Result<(), ShipError> {
        let events = self.batch.take();
        if let Err(e) = self.submitter.submit(&self.stream_name, events).await {
            error!(
                "Stream worker for {} aborted, queued logs will not be delivered: {e}",
                self.stream_name
            );
            return Err(e);
        }
        self.batch.reopen();
        Ok(())
    }
}
