// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Instrumentation hook points.
//!
//! The runtimes report call and dispatch events to an [`RpcObserver`].
//! Counters, timers and exporters live outside this crate.

use crate::error::{ErrorCode, RpcError, RpcResult};
use std::time::Duration;

/// How a client call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    Remote(ErrorCode),
    Timeout,
    Canceled,
    /// Failed locally (encode, decode, transport, naming)
    LocalError,
}

impl CallOutcome {
    pub fn from_result<T>(result: &RpcResult<T>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(RpcError::Remote { code, .. }) => Self::Remote(*code),
            Err(RpcError::Timeout(_)) => Self::Timeout,
            Err(RpcError::Canceled) => Self::Canceled,
            Err(_) => Self::LocalError,
        }
    }
}

/// Receives runtime events. Every method defaults to a no-op.
///
/// Called inline on the hot path; implementations must not block.
pub trait RpcObserver: Send + Sync + 'static {
    /// A client call is about to publish.
    fn call_started(&self, _subject: &str) {}

    /// A client call completed.
    fn call_finished(&self, _subject: &str, _outcome: CallOutcome, _elapsed: Duration) {}

    /// A dispatcher accepted an inbound request.
    fn dispatch_started(&self, _subject: &str) {}

    /// A dispatcher produced a reply; `error` is `None` on success.
    fn dispatch_finished(
        &self,
        _subject: &str,
        _method: &str,
        _error: Option<ErrorCode>,
        _elapsed: Duration,
    ) {
    }

    /// A reply arrived for a call that had already completed.
    fn late_reply_discarded(&self, _reply_subject: &str) {}
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl RpcObserver for NoopObserver {}
