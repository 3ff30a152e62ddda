// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Client call runtime.
//!
//! A [`Client`] turns a method call into a request published on the bus and
//! waits for the matching reply:
//!
//! 1. resolve the subject (the method must exist in the bound descriptor)
//! 2. encode the request; on failure nothing is published
//! 3. register the call under a fresh reply subject
//! 4. publish with the reply subject and the remaining time budget
//! 5. wait for the reply, the deadline or cancellation, whichever is first
//!
//! Replies are received through one wildcard subscription per client,
//! `<inbox>.*`, created on the first call. A background task routes each
//! reply to the pending call whose reply subject matches exactly; replies
//! for calls that already finished are discarded.

use crate::config::ClientConfig;
use crate::descriptor::ServiceDescriptor;
use crate::envelope::{self, DecodeError, ReplyEnvelope, TIMEOUT_HEADER};
use crate::error::{RpcError, RpcResult};
use crate::message::Message;
use crate::observer::{CallOutcome, NoopObserver, RpcObserver};
use crate::subject::{Subject, SubjectResolver, WILDCARD_TOKEN};
use crate::transport::{BusMessage, Subscription, Transport};
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, OnceCell};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

type PendingMap = DashMap<String, oneshot::Sender<BusMessage>>;

/// Stand-in for "no deadline" (about thirty years).
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    timeout: Option<Duration>,
    deadline: Option<std::time::Instant>,
    cancellation: Option<CancellationToken>,
    routing_key: Option<String>,
}

impl CallOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Give up after `timeout`.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Give up at `deadline`. With a timeout as well, the earlier one wins.
    #[must_use]
    pub fn with_deadline(mut self, deadline: std::time::Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Abort the call when `token` is canceled.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Address a single dispatcher instance instead of the queue group.
    #[must_use]
    pub fn with_routing_key(mut self, key: impl Into<String>) -> Self {
        self.routing_key = Some(key.into());
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    pub fn deadline(&self) -> Option<std::time::Instant> {
        self.deadline
    }

    pub fn routing_key(&self) -> Option<&str> {
        self.routing_key.as_deref()
    }

    /// A timeout too large to represent as an instant waits until
    /// [`FAR_FUTURE`] instead.
    fn resolve_deadline(&self, now: Instant, default: Duration) -> Instant {
        let after = |t: Duration| now.checked_add(t).unwrap_or_else(|| now + FAR_FUTURE);
        let from_timeout = self.timeout.map(after);
        let from_deadline = self.deadline.map(Instant::from_std);
        match (from_timeout, from_deadline) {
            (Some(a), Some(b)) => a.min(b),
            (Some(d), None) | (None, Some(d)) => d,
            (None, None) => after(default),
        }
    }
}

/// One outstanding request; its pending entry is removed when this drops,
/// whatever way the call ends.
struct InFlightCall<'a> {
    pending: &'a PendingMap,
    reply_to: String,
}

impl<'a> InFlightCall<'a> {
    fn register(pending: &'a PendingMap, reply_to: String) -> (Self, oneshot::Receiver<BusMessage>) {
        let (tx, rx) = oneshot::channel();
        pending.insert(reply_to.clone(), tx);
        (Self { pending, reply_to }, rx)
    }
}

impl Drop for InFlightCall<'_> {
    fn drop(&mut self) {
        self.pending.remove(&self.reply_to);
    }
}

/// Typed RPC client bound to one service.
///
/// Safe to share between tasks; concurrent calls only share the pending
/// map, keyed by their unique reply subjects.
pub struct Client<T: Transport> {
    transport: Arc<T>,
    descriptor: Arc<ServiceDescriptor>,
    resolver: SubjectResolver,
    config: ClientConfig,
    inbox: String,
    pending: Arc<PendingMap>,
    listener: OnceCell<JoinHandle<()>>,
    /// Canceled once the inbox subscription has ended
    inbox_closed: CancellationToken,
    observer: Arc<dyn RpcObserver>,
}

impl<T: Transport> Client<T> {
    /// Create a client for the service `descriptor` describes.
    pub fn new(
        transport: Arc<T>,
        descriptor: impl Into<Arc<ServiceDescriptor>>,
        config: ClientConfig,
    ) -> RpcResult<Self> {
        Self::with_observer(transport, descriptor, config, Arc::new(NoopObserver))
    }

    /// Create a client reporting to `observer`.
    pub fn with_observer(
        transport: Arc<T>,
        descriptor: impl Into<Arc<ServiceDescriptor>>,
        config: ClientConfig,
        observer: Arc<dyn RpcObserver>,
    ) -> RpcResult<Self> {
        config.validate()?;
        let resolver = SubjectResolver::new(config.namespace.clone())?;
        let inbox = transport.new_inbox(&config.inbox_prefix);

        Ok(Self {
            transport,
            descriptor: descriptor.into(),
            resolver,
            config,
            inbox,
            pending: Arc::new(DashMap::new()),
            listener: OnceCell::new(),
            inbox_closed: CancellationToken::new(),
            observer,
        })
    }

    /// Call `method` with a typed request and decode the typed response.
    pub async fn call<Req: Message, Resp: Message>(
        &self,
        method: &str,
        request: &Req,
        options: CallOptions,
    ) -> RpcResult<Resp> {
        let subject = self.subject_for(method, options.routing_key())?;
        let payload = request.encode().map_err(RpcError::Encode)?;
        let reply = self.invoke(subject, payload, options).await?;
        Resp::decode(&reply).map_err(|e| RpcError::Decode(DecodeError::Payload(e)))
    }

    /// Call `method` with an already encoded payload.
    pub async fn call_raw(
        &self,
        method: &str,
        payload: Bytes,
        options: CallOptions,
    ) -> RpcResult<Bytes> {
        let subject = self.subject_for(method, options.routing_key())?;
        self.invoke(subject, payload, options).await
    }

    /// Subject a call to `method` is published on.
    pub fn subject_for(&self, method: &str, routing_key: Option<&str>) -> RpcResult<Subject> {
        let service = self.descriptor.name();
        if self.descriptor.method(method).is_none() {
            return Err(RpcError::MethodNotFound {
                service: service.to_string(),
                method: method.to_string(),
            });
        }
        Ok(self.resolver.resolve(service, method, routing_key)?)
    }

    async fn invoke(
        &self,
        subject: Subject,
        payload: Bytes,
        options: CallOptions,
    ) -> RpcResult<Bytes> {
        let started = Instant::now();
        self.observer.call_started(subject.as_str());

        let result = self.exchange(&subject, payload, &options, started).await;

        self.observer.call_finished(
            subject.as_str(),
            CallOutcome::from_result(&result),
            started.elapsed(),
        );
        if let Err(e) = &result {
            log::debug!("call to {} failed: {}", subject, e);
        }
        result
    }

    async fn exchange(
        &self,
        subject: &Subject,
        payload: Bytes,
        options: &CallOptions,
        started: Instant,
    ) -> RpcResult<Bytes> {
        if options
            .cancellation
            .as_ref()
            .is_some_and(CancellationToken::is_cancelled)
        {
            return Err(RpcError::Canceled);
        }

        let deadline = options.resolve_deadline(started, self.config.timeout());
        let budget = deadline.saturating_duration_since(started);
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(RpcError::Timeout(budget));
        }

        self.ensure_listener().await?;

        let reply_to = format!("{}.{}", self.inbox, uuid::Uuid::new_v4().simple());
        let (call, reply) = InFlightCall::register(&self.pending, reply_to);
        // Checked after registering: the listener marks the inbox closed
        // before it drops the pending senders.
        if self.inbox_closed.is_cancelled() {
            return Err(RpcError::Shutdown);
        }

        let remaining_ms = u64::try_from(remaining.as_millis())
            .unwrap_or(u64::MAX)
            .max(1);
        let message = BusMessage::new(subject.as_str(), envelope::encode_request(payload))
            .with_reply(call.reply_to.as_str())
            .with_header(TIMEOUT_HEADER, remaining_ms.to_string());

        log::debug!("call {} (reply to {})", subject, call.reply_to);
        self.transport.publish(message).await?;

        let canceled = async {
            match &options.cancellation {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        let outcome = tokio::select! {
            biased;
            reply = reply => match reply {
                Ok(message) => decode_outcome(&message.payload),
                Err(_) => Err(RpcError::Shutdown),
            },
            _ = canceled => Err(RpcError::Canceled),
            _ = tokio::time::sleep_until(deadline) => Err(RpcError::Timeout(budget)),
        };

        drop(call);
        outcome
    }

    async fn ensure_listener(&self) -> RpcResult<()> {
        self.listener
            .get_or_try_init(|| async {
                let pattern = format!("{}.{}", self.inbox, WILDCARD_TOKEN);
                let subscription = self.transport.subscribe(&pattern, None).await?;
                log::debug!("client for {} listening on {}", self.service_name(), pattern);
                Ok::<_, RpcError>(tokio::spawn(reply_listener(
                    subscription,
                    Arc::clone(&self.pending),
                    self.inbox_closed.clone(),
                    Arc::clone(&self.observer),
                )))
            })
            .await?;
        Ok(())
    }

    /// Calls currently waiting for a reply.
    pub fn pending_calls(&self) -> usize {
        self.pending.len()
    }

    pub fn descriptor(&self) -> &Arc<ServiceDescriptor> {
        &self.descriptor
    }

    pub fn service_name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Root of this client's reply subjects.
    pub fn inbox(&self) -> &str {
        &self.inbox
    }
}

impl<T: Transport> Drop for Client<T> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.get() {
            listener.abort();
        }
    }
}

impl<T: Transport> std::fmt::Debug for Client<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("service", &self.service_name())
            .field("namespace", &self.config.namespace)
            .field("inbox", &self.inbox)
            .field("pending", &self.pending.len())
            .finish_non_exhaustive()
    }
}

fn decode_outcome(frame: &Bytes) -> RpcResult<Bytes> {
    match envelope::decode_reply(frame)? {
        ReplyEnvelope::Success(payload) => Ok(payload),
        ReplyEnvelope::Failure { code, message } => Err(RpcError::Remote { code, message }),
    }
}

/// Routes replies to pending calls until the inbox subscription ends, then
/// fails every call still waiting.
async fn reply_listener(
    mut subscription: Subscription,
    pending: Arc<PendingMap>,
    closed: CancellationToken,
    observer: Arc<dyn RpcObserver>,
) {
    while let Some(message) = subscription.next().await {
        let delivered = match pending.remove(&message.subject) {
            Some((_, tx)) => tx.send(message).map_err(|m| m.subject).err(),
            None => Some(message.subject),
        };
        if let Some(subject) = delivered {
            log::debug!("discarding late reply on {}", subject);
            observer.late_reply_discarded(&subject);
        }
    }

    log::warn!("reply inbox {} closed", subscription.pattern());
    closed.cancel();
    // Dropping the senders wakes the waiting calls with `Shutdown`.
    pending.clear();
}
