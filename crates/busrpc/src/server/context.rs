// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Per-invocation context handed to service implementations.

use crate::envelope::TIMEOUT_HEADER;
use crate::transport::Headers;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

/// What an implementation knows about the call it is serving.
#[derive(Debug, Clone)]
pub struct CallContext {
    subject: String,
    method: String,
    routing_key: Option<String>,
    deadline: Option<Instant>,
    headers: Headers,
    cancellation: CancellationToken,
}

impl CallContext {
    pub fn new(subject: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            method: method.into(),
            routing_key: None,
            deadline: None,
            headers: Headers::new(),
            cancellation: CancellationToken::new(),
        }
    }

    #[must_use]
    pub fn with_routing_key(mut self, key: impl Into<String>) -> Self {
        self.routing_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attach inbound headers; a valid timeout header also sets the deadline.
    #[must_use]
    pub fn with_headers(mut self, headers: Headers) -> Self {
        if let Some(ms) = headers
            .get(TIMEOUT_HEADER)
            .and_then(|v| v.trim().parse::<u64>().ok())
        {
            self.deadline = Instant::now().checked_add(Duration::from_millis(ms));
        }
        self.headers = headers;
        self
    }

    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Subject the request was received on.
    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn routing_key(&self) -> Option<&str> {
        self.routing_key.as_deref()
    }

    /// Point after which the caller will have given up, if it said.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left before the caller's deadline.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Token canceled when the dispatcher stops.
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    pub fn is_canceled(&self) -> bool {
        self.cancellation.is_cancelled()
    }
}
