// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Dispatcher: subscription lifecycle and the per-message dispatch path.

use super::{CallContext, MethodTable};
use crate::config::DispatcherConfig;
use crate::descriptor::ServiceDescriptor;
use crate::envelope::{self, ReplyEnvelope};
use crate::error::{ErrorCode, RpcError, RpcResult};
use crate::observer::{NoopObserver, RpcObserver};
use crate::subject::SubjectResolver;
use crate::transport::{BusMessage, Subscription, Transport};
use bytes::Bytes;
use futures::FutureExt;
use parking_lot::Mutex;
use std::any::Any;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

/// Lifecycle of a [`Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatcherState {
    /// Built, not yet subscribed
    Created,
    /// Receiving requests
    Subscribed,
    /// Unsubscribed, waiting for in-flight invocations
    Stopping,
    /// Fully stopped; cannot be restarted
    Stopped,
}

impl fmt::Display for DispatcherState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Subscribed => "subscribed",
            Self::Stopping => "stopping",
            Self::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

/// State shared between the dispatcher handle, its receive loops and the
/// invocation tasks.
struct DispatchCore<T: Transport> {
    transport: Arc<T>,
    table: MethodTable,
    resolver: SubjectResolver,
    /// Stops the receive loops
    intake: CancellationToken,
    /// Parent of every call context's token
    shutdown: CancellationToken,
    tracker: TaskTracker,
    limiter: Option<Arc<Semaphore>>,
    processed: AtomicU64,
    observer: Arc<dyn RpcObserver>,
}

/// Binds a [`MethodTable`] to a transport and serves it.
///
/// Every inbound message is handled on its own task; a slow or faulting
/// invocation never blocks or kills the others.
pub struct Dispatcher<T: Transport> {
    core: Arc<DispatchCore<T>>,
    config: DispatcherConfig,
    queue_group: String,
    state: Mutex<DispatcherState>,
    loops: Mutex<Vec<JoinHandle<()>>>,
}

impl<T: Transport> Dispatcher<T> {
    /// Create a dispatcher; nothing is subscribed until [`start`](Self::start).
    pub fn new(transport: Arc<T>, table: MethodTable, config: DispatcherConfig) -> RpcResult<Self> {
        Self::with_observer(transport, table, config, Arc::new(NoopObserver))
    }

    /// Create a dispatcher reporting to `observer`.
    pub fn with_observer(
        transport: Arc<T>,
        table: MethodTable,
        config: DispatcherConfig,
        observer: Arc<dyn RpcObserver>,
    ) -> RpcResult<Self> {
        config.validate()?;
        let resolver = SubjectResolver::new(config.namespace.clone())?;
        let queue_group = config.queue_group_for(table.service_name());
        let limiter = config.max_in_flight.map(|n| Arc::new(Semaphore::new(n)));

        Ok(Self {
            core: Arc::new(DispatchCore {
                transport,
                table,
                resolver,
                intake: CancellationToken::new(),
                shutdown: CancellationToken::new(),
                tracker: TaskTracker::new(),
                limiter,
                processed: AtomicU64::new(0),
                observer,
            }),
            config,
            queue_group,
            state: Mutex::new(DispatcherState::Created),
            loops: Mutex::new(Vec::new()),
        })
    }

    /// Subscribe and start serving requests.
    pub async fn start(&self) -> RpcResult<()> {
        {
            let mut state = self.state.lock();
            match *state {
                DispatcherState::Created => *state = DispatcherState::Subscribed,
                DispatcherState::Subscribed => return Err(RpcError::AlreadyStarted),
                DispatcherState::Stopping | DispatcherState::Stopped => {
                    return Err(RpcError::Shutdown)
                }
            }
        }

        match self.subscribe_all().await {
            Ok(subscriptions) => {
                let mut loops = self.loops.lock();
                for subscription in subscriptions {
                    log::info!(
                        "Dispatcher '{}' listening on {} (group {:?})",
                        self.service_name(),
                        subscription.pattern(),
                        subscription.queue_group()
                    );
                    let core = Arc::clone(&self.core);
                    loops.push(tokio::spawn(receive_loop(core, subscription)));
                }
                Ok(())
            }
            Err(e) => {
                *self.state.lock() = DispatcherState::Created;
                Err(e)
            }
        }
    }

    async fn subscribe_all(&self) -> RpcResult<Vec<Subscription>> {
        let service = self.service_name();
        let resolver = &self.core.resolver;
        let transport = &self.core.transport;

        let pattern = resolver.service_pattern(service)?;
        let mut subscriptions = vec![
            transport
                .subscribe(pattern.as_str(), Some(&self.queue_group))
                .await?,
        ];

        if let Some(key) = &self.config.routing_key {
            let pattern = resolver.instance_pattern(service, key)?;
            subscriptions.push(transport.subscribe(pattern.as_str(), None).await?);
        }

        Ok(subscriptions)
    }

    /// Stop serving.
    ///
    /// Unsubscribes first, then cancels the call contexts, then waits for
    /// every in-flight invocation to finish. Idempotent.
    pub async fn stop(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                DispatcherState::Created => {
                    *state = DispatcherState::Stopped;
                    self.core.intake.cancel();
                    self.core.shutdown.cancel();
                    self.core.tracker.close();
                    return;
                }
                DispatcherState::Stopping | DispatcherState::Stopped => return,
                DispatcherState::Subscribed => *state = DispatcherState::Stopping,
            }
        }
        log::info!("Dispatcher '{}' stopping...", self.service_name());

        self.core.intake.cancel();
        let loops = std::mem::take(&mut *self.loops.lock());
        for handle in loops {
            if let Err(e) = handle.await {
                log::warn!("receive loop ended abnormally: {}", e);
            }
        }

        self.core.shutdown.cancel();
        self.core.tracker.close();
        self.core.tracker.wait().await;

        *self.state.lock() = DispatcherState::Stopped;
        log::info!(
            "Dispatcher '{}' stopped after {} requests",
            self.service_name(),
            self.requests_processed()
        );
    }

    /// Process one inbound message and publish its reply.
    ///
    /// Entry point for transports that push messages instead of being
    /// polled. The call counts as in flight for [`stop`](Self::stop) and
    /// takes a `max_in_flight` slot; once stopping it fails with
    /// `Shutdown` and nothing is invoked.
    pub async fn handle(&self, message: BusMessage) -> RpcResult<()> {
        // Taken before the check so a concurrent stop() waits for this call.
        let _tracked = self.core.tracker.token();
        if self.core.intake.is_cancelled() {
            return Err(RpcError::Shutdown);
        }

        let _permit = match &self.core.limiter {
            Some(limiter) => Some(
                Arc::clone(limiter)
                    .acquire_owned()
                    .await
                    .map_err(|_| RpcError::Shutdown)?,
            ),
            None => None,
        };

        self.core.handle(message).await
    }

    /// Route `payload` to the method named by `ctx` and produce the reply.
    ///
    /// Never fails: every problem becomes a `Failure` reply.
    pub async fn dispatch(&self, ctx: CallContext, payload: Bytes) -> ReplyEnvelope {
        self.core.dispatch(ctx, payload).await
    }

    pub fn state(&self) -> DispatcherState {
        *self.state.lock()
    }

    pub fn queue_group(&self) -> &str {
        &self.queue_group
    }

    pub fn service_name(&self) -> &str {
        self.core.table.service_name()
    }

    pub fn descriptor(&self) -> &ServiceDescriptor {
        self.core.table.descriptor()
    }

    /// Requests answered (or dropped for lack of a reply subject) so far.
    pub fn requests_processed(&self) -> u64 {
        self.core.processed.load(Ordering::Relaxed)
    }

    /// Invocations currently running.
    pub fn in_flight(&self) -> usize {
        self.core.tracker.len()
    }
}

impl<T: Transport> Drop for Dispatcher<T> {
    fn drop(&mut self) {
        self.core.intake.cancel();
        self.core.shutdown.cancel();
    }
}

impl<T: Transport> fmt::Debug for Dispatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("service", &self.service_name())
            .field("queue_group", &self.queue_group)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

async fn receive_loop<T: Transport>(core: Arc<DispatchCore<T>>, mut subscription: Subscription) {
    loop {
        let message = tokio::select! {
            biased;
            _ = core.intake.cancelled() => break,
            message = subscription.next() => match message {
                Some(message) => message,
                None => break,
            },
        };

        // Waiting here keeps further messages queued in the subscription.
        let permit = match &core.limiter {
            Some(limiter) => tokio::select! {
                biased;
                _ = core.intake.cancelled() => break,
                permit = Arc::clone(limiter).acquire_owned() => match permit {
                    Ok(permit) => Some(permit),
                    Err(_) => break,
                },
            },
            None => None,
        };

        let task_core = Arc::clone(&core);
        core.tracker.spawn(async move {
            if let Err(e) = task_core.handle(message).await {
                log::warn!("failed to publish reply: {}", e);
            }
            drop(permit);
        });
    }

    subscription.unsubscribe();
}

impl<T: Transport> DispatchCore<T> {
    async fn handle(&self, message: BusMessage) -> RpcResult<()> {
        let started = Instant::now();
        self.observer.dispatch_started(&message.subject);

        let service = self.table.service_name();
        let (method, routing_key) = match self.resolver.parse(service, &message.subject) {
            Some(routed) => (
                routed.method.to_string(),
                routed.routing_key.map(str::to_string),
            ),
            None => (String::new(), None),
        };

        let mut ctx = CallContext::new(message.subject.clone(), method.clone())
            .with_headers(message.headers)
            .with_cancellation(self.shutdown.child_token());
        if let Some(key) = routing_key {
            ctx = ctx.with_routing_key(key);
        }

        let reply = match envelope::decode_request(&message.payload) {
            Ok(payload) => self.dispatch(ctx, payload).await,
            Err(e) => ReplyEnvelope::failure(ErrorCode::BadRequest, e.to_string()),
        };

        self.processed.fetch_add(1, Ordering::Relaxed);
        let error = reply.error_code();
        self.observer
            .dispatch_finished(&message.subject, &method, error, started.elapsed());

        match message.reply {
            Some(reply_to) => {
                log::debug!(
                    "{} -> {} ({})",
                    message.subject,
                    reply_to,
                    error.map_or_else(|| "ok".to_string(), |c| c.to_string())
                );
                let frame = envelope::encode_reply(&reply);
                self.transport
                    .publish(BusMessage::new(reply_to, frame))
                    .await?;
            }
            None => log::trace!("no reply subject on {}, reply dropped", message.subject),
        }

        Ok(())
    }

    async fn dispatch(&self, ctx: CallContext, payload: Bytes) -> ReplyEnvelope {
        let service = self.table.service_name();
        let Some(handler) = self.table.handler(ctx.method()) else {
            log::debug!("unknown method {:?} on {}", ctx.method(), ctx.subject());
            return ReplyEnvelope::failure(
                ErrorCode::UnknownMethod,
                format!("unknown method {}.{}", service, ctx.method()),
            );
        };

        let method = ctx.method().to_string();
        let handler = Arc::clone(handler);
        let invocation = AssertUnwindSafe(async move { handler(ctx, payload).await });

        match invocation.catch_unwind().await {
            Ok(reply) => reply,
            Err(panic) => {
                log::warn!(
                    "handler {}.{} panicked: {}",
                    service,
                    method,
                    panic_message(panic.as_ref())
                );
                ReplyEnvelope::failure(
                    ErrorCode::InternalError,
                    format!("internal error in {}.{}", service, method),
                )
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        *s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
