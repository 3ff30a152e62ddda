// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Method table: method name to type-erased invocation closure.

use super::CallContext;
use crate::descriptor::{DescriptorError, ServiceDescriptor};
use crate::envelope::ReplyEnvelope;
use crate::error::{ApplicationError, ErrorCode};
use crate::message::Message;
use bytes::Bytes;
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// Type-erased handler: request payload in, reply envelope out.
pub(crate) type Handler =
    Arc<dyn Fn(CallContext, Bytes) -> BoxFuture<'static, ReplyEnvelope> + Send + Sync>;

/// Immutable mapping from method name to handler, checked against the
/// service descriptor when built.
#[derive(Clone)]
pub struct MethodTable {
    descriptor: Arc<ServiceDescriptor>,
    handlers: HashMap<String, Handler>,
}

impl MethodTable {
    pub fn builder(descriptor: impl Into<Arc<ServiceDescriptor>>) -> MethodTableBuilder {
        MethodTableBuilder {
            descriptor: descriptor.into(),
            handlers: HashMap::new(),
            error: None,
        }
    }

    pub fn descriptor(&self) -> &Arc<ServiceDescriptor> {
        &self.descriptor
    }

    pub fn service_name(&self) -> &str {
        self.descriptor.name()
    }

    pub fn contains(&self, method: &str) -> bool {
        self.handlers.contains_key(method)
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub(crate) fn handler(&self, method: &str) -> Option<&Handler> {
        self.handlers.get(method)
    }
}

impl std::fmt::Debug for MethodTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut methods: Vec<_> = self.handlers.keys().collect();
        methods.sort();
        f.debug_struct("MethodTable")
            .field("service", &self.descriptor.name())
            .field("methods", &methods)
            .finish()
    }
}

/// Binds handlers to the methods of one service.
///
/// Errors are deferred to [`build`](MethodTableBuilder::build) so that
/// bindings chain.
pub struct MethodTableBuilder {
    descriptor: Arc<ServiceDescriptor>,
    handlers: HashMap<String, Handler>,
    error: Option<DescriptorError>,
}

impl MethodTableBuilder {
    /// Bind a typed request/response handler.
    ///
    /// A request that does not decode as `Req` is answered with
    /// `BadRequest`; a response that does not encode with `InternalError`;
    /// an `Err` from the handler with `ApplicationError`.
    pub fn unary<Req, Resp, F, Fut>(self, method: &str, handler: F) -> Self
    where
        Req: Message,
        Resp: Message,
        F: Fn(CallContext, Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Resp, ApplicationError>> + Send + 'static,
    {
        let erased: Handler = Arc::new(move |ctx: CallContext, payload: Bytes| {
            let request = match Req::decode(&payload) {
                Ok(request) => request,
                Err(e) => {
                    log::debug!("bad request for {}: {}", ctx.subject(), e);
                    let reply = ReplyEnvelope::failure(ErrorCode::BadRequest, e.to_string());
                    return futures::future::ready(reply).boxed();
                }
            };

            let response = handler(ctx, request);
            async move {
                match response.await {
                    Ok(response) => match response.encode() {
                        Ok(payload) => ReplyEnvelope::Success(payload),
                        Err(e) => {
                            log::warn!("failed to encode response: {}", e);
                            ReplyEnvelope::failure(
                                ErrorCode::InternalError,
                                format!("failed to encode response: {e}"),
                            )
                        }
                    },
                    Err(err) => ReplyEnvelope::failure(ErrorCode::ApplicationError, err.message()),
                }
            }
            .boxed()
        });

        self.bind(method, erased)
    }

    /// Bind a handler working on raw payload bytes and reply envelopes.
    pub fn raw<F, Fut>(self, method: &str, handler: F) -> Self
    where
        F: Fn(CallContext, Bytes) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ReplyEnvelope> + Send + 'static,
    {
        let erased: Handler =
            Arc::new(move |ctx: CallContext, payload: Bytes| handler(ctx, payload).boxed());
        self.bind(method, erased)
    }

    fn bind(mut self, method: &str, handler: Handler) -> Self {
        if self.error.is_some() {
            return self;
        }

        let service = self.descriptor.name().to_string();
        if self.descriptor.method(method).is_none() {
            self.error = Some(DescriptorError::UndeclaredMethod {
                service,
                method: method.to_string(),
            });
        } else if self.handlers.insert(method.to_string(), handler).is_some() {
            self.error = Some(DescriptorError::DuplicateHandler {
                service,
                method: method.to_string(),
            });
        }
        self
    }

    /// Finish the table. Every declared method must have exactly one handler.
    pub fn build(self) -> Result<MethodTable, DescriptorError> {
        if let Some(err) = self.error {
            return Err(err);
        }

        if let Some(missing) = self
            .descriptor
            .method_names()
            .find(|m| !self.handlers.contains_key(*m))
        {
            return Err(DescriptorError::MissingHandler {
                service: self.descriptor.name().to_string(),
                method: missing.to_string(),
            });
        }

        Ok(MethodTable {
            descriptor: self.descriptor,
            handlers: self.handlers,
        })
    }
}
