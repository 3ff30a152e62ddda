// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-process publish/subscribe bus.
//!
//! Reference semantics for the [`Transport`] trait:
//! - subjects are `.`-separated tokens; patterns may use `*` (exactly one
//!   token) and a trailing `>` (one or more tokens)
//! - every plain subscriber whose pattern matches gets a copy
//! - subscribers sharing a queue group on the same pattern form one group;
//!   each message reaches exactly one member, chosen round-robin
//! - a message with no interested subscriber is dropped

use super::{BusMessage, Subscription, Transport, TransportError};
use crate::subject::{DELIMITER, WILDCARD_TAIL, WILDCARD_TOKEN};
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;

/// In-process bus shared by clients and dispatchers of one process.
///
/// Cloning yields another handle to the same bus.
#[derive(Clone, Default)]
pub struct MemoryBus {
    inner: Arc<BusInner>,
}

#[derive(Default)]
struct BusInner {
    entries: RwLock<Vec<Entry>>,
    next_id: AtomicU64,
    group_cursor: AtomicUsize,
    closed: AtomicBool,
    published: AtomicU64,
    delivered: AtomicU64,
}

struct Entry {
    id: u64,
    pattern: String,
    tokens: Vec<String>,
    queue_group: Option<String>,
    sender: mpsc::UnboundedSender<BusMessage>,
}

impl MemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live subscriptions.
    pub fn subscription_count(&self) -> usize {
        self.inner.entries.read().len()
    }

    /// Number of live subscriptions on exactly `pattern`.
    pub fn subscribers_of(&self, pattern: &str) -> usize {
        self.inner
            .entries
            .read()
            .iter()
            .filter(|e| e.pattern == pattern)
            .count()
    }

    /// Messages accepted by `publish` so far.
    pub fn published(&self) -> u64 {
        self.inner.published.load(Ordering::Relaxed)
    }

    /// Copies handed to subscribers so far.
    pub fn delivered(&self) -> u64 {
        self.inner.delivered.load(Ordering::Relaxed)
    }

    /// Close the bus: drop every subscription and refuse further traffic.
    pub fn close(&self) {
        self.inner.closed.store(true, Ordering::Release);
        self.inner.entries.write().clear();
        log::debug!("memory bus closed");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    fn deliver(&self, message: BusMessage) -> usize {
        let subject: Vec<&str> = message.subject.split(DELIMITER).collect();
        let entries = self.inner.entries.read();

        let mut targets: Vec<&Entry> = Vec::new();
        let mut groups: BTreeMap<(&str, &str), Vec<&Entry>> = BTreeMap::new();

        for entry in entries.iter() {
            if entry.sender.is_closed() || !pattern_matches(&entry.tokens, &subject) {
                continue;
            }
            match entry.queue_group.as_deref() {
                Some(group) => groups
                    .entry((entry.pattern.as_str(), group))
                    .or_default()
                    .push(entry),
                None => targets.push(entry),
            }
        }

        for members in groups.values() {
            let cursor = self.inner.group_cursor.fetch_add(1, Ordering::Relaxed);
            targets.push(members[cursor % members.len()]);
        }

        let mut delivered = 0;
        for entry in targets {
            if entry.sender.send(message.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

#[async_trait]
impl Transport for MemoryBus {
    async fn publish(&self, message: BusMessage) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if !is_valid_subject(&message.subject) {
            return Err(TransportError::InvalidSubject(message.subject));
        }

        self.inner.published.fetch_add(1, Ordering::Relaxed);
        let subject = message.subject.clone();
        let delivered = self.deliver(message);
        self.inner
            .delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);

        if delivered == 0 {
            log::trace!("no subscriber for {}", subject);
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        pattern: &str,
        queue_group: Option<&str>,
    ) -> Result<Subscription, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        if !is_valid_pattern(pattern) {
            return Err(TransportError::InvalidSubject(pattern.to_string()));
        }
        if let Some(group) = queue_group {
            if group.is_empty() || group.chars().any(|c| c.is_whitespace()) {
                return Err(TransportError::Subscribe(format!(
                    "invalid queue group {group:?}"
                )));
            }
        }

        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::unbounded_channel();
        self.inner.entries.write().push(Entry {
            id,
            pattern: pattern.to_string(),
            tokens: pattern.split(DELIMITER).map(str::to_string).collect(),
            queue_group: queue_group.map(str::to_string),
            sender,
        });
        log::trace!("subscription {} on {} (group {:?})", id, pattern, queue_group);

        let bus: Weak<BusInner> = Arc::downgrade(&self.inner);
        Ok(Subscription::new(
            pattern,
            queue_group.map(str::to_string),
            receiver,
            move || {
                if let Some(bus) = bus.upgrade() {
                    bus.entries.write().retain(|e| e.id != id);
                }
            },
        ))
    }
}

fn is_valid_subject(subject: &str) -> bool {
    subject
        .split(DELIMITER)
        .all(|t| !t.is_empty() && t != WILDCARD_TOKEN && t != WILDCARD_TAIL)
}

fn is_valid_pattern(pattern: &str) -> bool {
    let tokens: Vec<&str> = pattern.split(DELIMITER).collect();
    let last = tokens.len() - 1;
    tokens.iter().enumerate().all(|(i, t)| {
        !t.is_empty()
            && (*t == WILDCARD_TOKEN
                || (*t == WILDCARD_TAIL && i == last)
                || !t.contains(['*', '>']))
    })
}

fn pattern_matches(pattern: &[String], subject: &[&str]) -> bool {
    for (i, token) in pattern.iter().enumerate() {
        if token == WILDCARD_TAIL {
            return subject.len() > i;
        }
        match subject.get(i) {
            Some(s) if token == WILDCARD_TOKEN || token == s => {}
            _ => return false,
        }
    }
    pattern.len() == subject.len()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn tokens(p: &str) -> Vec<String> {
        p.split('.').map(str::to_string).collect()
    }

    fn subject(s: &str) -> Vec<&str> {
        s.split('.').collect()
    }

    #[test]
    fn wildcard_matching() {
        assert!(pattern_matches(&tokens("a.b.c"), &subject("a.b.c")));
        assert!(!pattern_matches(&tokens("a.b.c"), &subject("a.b")));
        assert!(pattern_matches(&tokens("a.*.c"), &subject("a.x.c")));
        assert!(!pattern_matches(&tokens("a.*"), &subject("a.x.c")));
        assert!(pattern_matches(&tokens("a.>"), &subject("a.x.c")));
        assert!(!pattern_matches(&tokens("a.>"), &subject("a")));
        assert!(pattern_matches(&tokens("a.*.c.k"), &subject("a.m.c.k")));
        assert!(!pattern_matches(&tokens("a.*.c.k"), &subject("a.m.c.j")));
    }

    #[test]
    fn pattern_validation() {
        assert!(is_valid_pattern("a.*.c"));
        assert!(is_valid_pattern("a.>"));
        assert!(!is_valid_pattern("a.>.c"));
        assert!(!is_valid_pattern("a..c"));
        assert!(!is_valid_pattern("a.b*"));
        assert!(!is_valid_subject("a.*"));
        assert!(is_valid_subject("a.b"));
    }

    #[tokio::test]
    async fn fan_out_to_plain_subscribers() {
        let bus = MemoryBus::new();
        let mut first = bus.subscribe("news.*", None).await.unwrap();
        let mut second = bus.subscribe("news.>", None).await.unwrap();

        bus.publish(BusMessage::new("news.sports", &b"goal"[..]))
            .await
            .unwrap();

        assert_eq!(first.next().await.unwrap().payload, &b"goal"[..]);
        assert_eq!(second.next().await.unwrap().payload, &b"goal"[..]);
        assert_eq!(bus.delivered(), 2);
    }

    #[tokio::test]
    async fn queue_group_delivers_to_one_member() {
        let bus = MemoryBus::new();
        let mut a = bus.subscribe("work.*", Some("workers")).await.unwrap();
        let mut b = bus.subscribe("work.*", Some("workers")).await.unwrap();

        for i in 0..10u8 {
            bus.publish(BusMessage::new("work.item", vec![i])).await.unwrap();
        }
        assert_eq!(bus.delivered(), 10);

        let mut received = 0;
        for sub in [&mut a, &mut b] {
            while let Ok(Some(_)) =
                tokio::time::timeout(Duration::from_millis(20), sub.next()).await
            {
                received += 1;
            }
        }
        assert_eq!(received, 10);
    }

    #[tokio::test]
    async fn drop_unsubscribes() {
        let bus = MemoryBus::new();
        let sub = bus.subscribe("a.b", None).await.unwrap();
        assert_eq!(bus.subscription_count(), 1);
        drop(sub);
        assert_eq!(bus.subscription_count(), 0);

        bus.publish(BusMessage::new("a.b", &b"x"[..])).await.unwrap();
        assert_eq!(bus.delivered(), 0);
    }

    #[tokio::test]
    async fn closed_bus_refuses_traffic() {
        let bus = MemoryBus::new();
        let mut sub = bus.subscribe("a.b", None).await.unwrap();
        bus.close();

        assert!(sub.next().await.is_none());
        assert!(matches!(
            bus.publish(BusMessage::new("a.b", &b"x"[..])).await,
            Err(TransportError::Closed)
        ));
        assert!(bus.subscribe("a.b", None).await.is_err());
    }

    #[tokio::test]
    async fn rejects_wildcard_publish() {
        let bus = MemoryBus::new();
        assert!(matches!(
            bus.publish(BusMessage::new("a.*", &b"x"[..])).await,
            Err(TransportError::InvalidSubject(_))
        ));
    }
}
