// Copyright 2023-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use std::collections::HashMap;
use std::sync::Mutex;

/// Per-stream sequence tokens.
///
/// Only the submission currently holding a stream's lane reads or writes that
/// stream's entry, so the lock is never contended for a given stream.
#[derive(Debug, Default)]
pub struct SequenceTokenStore {
    tokens: Mutex<HashMap<String, Option<String>>>,
}

#[allow(clippy::expect_used)]
impl SequenceTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts tracking a stream with no token. Keeps an existing token.
    pub fn register(&self, stream_name: &str) {
        self.tokens
            .lock()
            .expect("lock poisoned")
            .entry(stream_name.to_string())
            .or_insert(None);
    }

    /// Token for the next append, `None` for a stream without one.
    #[must_use]
    pub fn get(&self, stream_name: &str) -> Option<String> {
        self.tokens
            .lock()
            .expect("lock poisoned")
            .get(stream_name)
            .cloned()
            .flatten()
    }

    /// Records the token returned by a successful append.
    pub fn advance(&self, stream_name: &str, next_token: Option<String>) {
        self.tokens
            .lock()
            .expect("lock poisoned")
            .insert(stream_name.to_string(), next_token);
    }
}
