// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! Flush controller.
//!
//! A flush closes the queue of every running stream worker, then waits for
//! each of them to send what it holds. Records emitted while a flush is in
//! progress go to a fresh worker and are not covered by that flush.

use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use crate::dispatcher::LogShipper;
use crate::errors::ShipError;

type WorkerTask = JoinHandle<Result<(), ShipError>>;

impl LogShipper {
    /// Blocks until every message emitted before the call has been submitted
    /// or its worker has failed.
    ///
    /// Every failure is logged. The first one is returned.
    pub async fn flush(&self) -> Result<(), ShipError> {
        let tasks: Vec<(String, WorkerTask)> = {
            let mut streams = self.streams.write().await;
            let mut tasks = Vec::new();
            for (name, state) in streams.iter_mut() {
                for retired in state.retired.drain(..) {
                    tasks.push((name.clone(), retired));
                }
                if let Some(worker) = state.worker.take() {
                    tasks.push((name.clone(), worker.close()));
                }
            }
            tasks
        };
        drain(tasks).await
    }
}

/// Awaits every worker task, in order.
pub(crate) async fn drain(tasks: Vec<(String, WorkerTask)>) -> Result<(), ShipError> {
    if tasks.is_empty() {
        return Ok(());
    }
    let n_workers = tasks.len();
    debug!("Flushing {n_workers} stream workers");
    let time = Instant::now();

    let mut first_error = None;
    for (stream, task) in tasks {
        let result = match task.await {
            Ok(result) => result,
            Err(e) => Err(ShipError::Worker {
                stream,
                reason: e.to_string(),
            }),
        };
        if let Err(e) = result {
            error!("Flush failed: {e}");
            first_error.get_or_insert(e);
        }
    }

    debug!(
        "Flushed {n_workers} stream workers in {} ms",
        time.elapsed().as_millis()
    );
    first_error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DeliveryFailure;
    use crate::store::StoreError;
    use tracing_test::traced_test;

    fn failed(stream: &str) -> ShipError {
        ShipError::delivery(
            stream,
            DeliveryFailure::Transport(StoreError::Transport("timeout".to_string())),
        )
    }

    #[tokio::test]
    async fn test_drain_nothing() {
        assert!(drain(Vec::new()).await.is_ok());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_drain_returns_first_error_and_logs_all() {
        let tasks = vec![
            ("a".to_string(), tokio::spawn(async { Ok(()) })),
            ("b".to_string(), tokio::spawn(async { Err(failed("b")) })),
            ("c".to_string(), tokio::spawn(async { Err(failed("c")) })),
        ];

        let result = drain(tasks).await;

        match result {
            Err(ShipError::Delivery { stream, .. }) => assert_eq!(stream, "b"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(logs_contain("Failed to deliver logs to stream b"));
        assert!(logs_contain("Failed to deliver logs to stream c"));
    }

    #[tokio::test]
    async fn test_drain_reports_panicked_worker() {
        let tasks: Vec<(String, WorkerTask)> = vec![(
            "a".to_string(),
            tokio::spawn(async { panic!("worker exploded") }),
        )];

        let result = drain(tasks).await;

        assert!(matches!(result, Err(ShipError::Worker { stream, .. }) if stream == "a"));
    }
}
