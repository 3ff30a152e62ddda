// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Publish/subscribe transport abstraction.
//!
//! The runtime needs very little from a bus:
//! - publish opaque bytes to a subject, optionally naming a reply subject
//! - subscribe to a subject pattern, optionally inside a queue group
//!   (each message goes to exactly one member of the group)
//! - mint unique inbox subjects for replies
//!
//! Connection management and delivery guarantees belong to the transport.
//! [`MemoryBus`] is the in-process reference implementation.

mod memory;

pub use memory::MemoryBus;

use async_trait::async_trait;
use bytes::Bytes;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::mpsc;

/// Out-of-band metadata attached to a message.
pub type Headers = BTreeMap<String, String>;

/// A message as carried by the bus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BusMessage {
    /// Subject the message was published to
    pub subject: String,
    /// Where the receiver should publish its reply, if anywhere
    pub reply: Option<String>,
    /// Out-of-band metadata
    pub headers: Headers,
    /// Opaque payload bytes
    pub payload: Bytes,
}

impl BusMessage {
    pub fn new(subject: impl Into<String>, payload: impl Into<Bytes>) -> Self {
        Self {
            subject: subject.into(),
            reply: None,
            headers: Headers::new(),
            payload: payload.into(),
        }
    }

    #[must_use]
    pub fn with_reply(mut self, reply: impl Into<String>) -> Self {
        self.reply = Some(reply.into());
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }
}

/// Transport-level failures.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("invalid subject {0:?}")]
    InvalidSubject(String),

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("subscribe failed: {0}")]
    Subscribe(String),
}

/// A subject-addressed publish/subscribe bus.
///
/// Implementations must allow concurrent publish and subscribe from many
/// tasks through a shared reference.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Publish a message. Delivery is best effort.
    async fn publish(&self, message: BusMessage) -> Result<(), TransportError>;

    /// Subscribe to a subject pattern.
    ///
    /// Subscribers sharing a `queue_group` on the same pattern split the
    /// matching messages between them, one member per message.
    async fn subscribe(
        &self,
        pattern: &str,
        queue_group: Option<&str>,
    ) -> Result<Subscription, TransportError>;

    /// Mint a fresh, unique inbox subject below `prefix`.
    fn new_inbox(&self, prefix: &str) -> String {
        format!("{}.{}", prefix, uuid::Uuid::new_v4().simple())
    }
}

/// Live interest in a subject pattern.
///
/// Unsubscribes when dropped.
pub struct Subscription {
    pattern: String,
    queue_group: Option<String>,
    receiver: mpsc::UnboundedReceiver<BusMessage>,
    release: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    /// Build a subscription fed by `receiver`; `release` runs once on
    /// unsubscribe.
    pub fn new(
        pattern: impl Into<String>,
        queue_group: Option<String>,
        receiver: mpsc::UnboundedReceiver<BusMessage>,
        release: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            queue_group,
            receiver,
            release: Some(Box::new(release)),
        }
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn queue_group(&self) -> Option<&str> {
        self.queue_group.as_deref()
    }

    /// Next delivered message, `None` once the transport side is gone.
    pub async fn next(&mut self) -> Option<BusMessage> {
        self.receiver.recv().await
    }

    /// Stop receiving. Messages already queued are dropped.
    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(release) = self.release.take() {
            release();
        }
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("pattern", &self.pattern)
            .field("queue_group", &self.queue_group)
            .finish_non_exhaustive()
    }
}
