// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

//! [`LogStore`] over the CloudWatch Logs JSON 1.1 HTTP protocol.
//!
//! Every operation is a `POST /` whose `X-Amz-Target` header names the
//! operation. Failed calls answer with a JSON body holding the error code in
//! `__type`. Requests are not signed; point the client at an endpoint that
//! accepts unsigned calls or at a signing proxy.

use async_trait::async_trait;
use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::error::Error;
use std::time::Duration;
use tracing::debug;

use crate::config::CloudWatchConfig;
use crate::errors::ShipError;
use crate::store::{LogStore, PutLogEventsOutput, PutLogEventsRequest, StoreError};

const TARGET_PREFIX: &str = "Logs_20140328";
const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CloudWatchLogsClient {
    client: reqwest::Client,
    endpoint: String,
}

impl CloudWatchLogsClient {
    pub fn new(config: &CloudWatchConfig) -> Result<Self, ShipError> {
        let client = build_client(config.https_proxy.as_deref(), config.timeout).map_err(|e| {
            ShipError::InvalidConfig(format!("unable to build HTTP client: {e}"))
        })?;
        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<B, T>(&self, operation: &str, body: &B) -> Result<T, StoreError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let payload = serde_json::to_vec(body)
            .map_err(|e| StoreError::Transport(format!("unable to encode {operation}: {e}")))?;

        let response = self
            .client
            .post(format!("{}/", self.endpoint))
            .header("Content-Type", CONTENT_TYPE)
            .header("X-Amz-Target", format!("{TARGET_PREFIX}.{operation}"))
            .body(payload)
            .send()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| StoreError::Transport(e.to_string()))?;

        if status.is_success() {
            let body: &[u8] = if bytes.is_empty() { b"{}" } else { &bytes };
            return serde_json::from_slice(body).map_err(|e| {
                StoreError::Transport(format!("invalid {operation} response: {e}"))
            });
        }

        match serde_json::from_slice::<ErrorBody>(&bytes) {
            Ok(ErrorBody {
                error_type: Some(error_type),
                message,
            }) => {
                let code = error_type.rsplit('#').next().unwrap_or_default();
                debug!("{operation} failed with {status}: {code}");
                Err(StoreError::service(code, message.unwrap_or_default()))
            }
            _ => Err(StoreError::Transport(format!(
                "{operation} failed with status {status}: {}",
                String::from_utf8_lossy(&bytes)
            ))),
        }
    }
}

#[async_trait]
impl LogStore for CloudWatchLogsClient {
    async fn create_log_group(&self, log_group: &str) -> Result<(), StoreError> {
        self.call::<_, IgnoredAny>("CreateLogGroup", &json!({ "logGroupName": log_group }))
            .await
            .map(|_| ())
    }

    async fn create_log_stream(
        &self,
        log_group: &str,
        log_stream: &str,
    ) -> Result<(), StoreError> {
        let body = json!({ "logGroupName": log_group, "logStreamName": log_stream });
        self.call::<_, IgnoredAny>("CreateLogStream", &body)
            .await
            .map(|_| ())
    }

    async fn put_log_events(
        &self,
        request: &PutLogEventsRequest,
    ) -> Result<PutLogEventsOutput, StoreError> {
        self.call("PutLogEvents", request).await
    }
}

fn build_client(
    proxy_url: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client, Box<dyn Error>> {
    let mut builder = reqwest::Client::builder().timeout(timeout);
    if let Some(proxy) = proxy_url {
        builder = builder.proxy(reqwest::Proxy::https(proxy)?);
    }
    Ok(builder.build()?)
}
