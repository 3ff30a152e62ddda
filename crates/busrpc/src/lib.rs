// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # busrpc - request/reply RPC over a publish/subscribe bus
//!
//! busrpc lets services call each other synchronously by method name while
//! the actual transport is a subject-addressed publish/subscribe bus. The
//! bus only promises best-effort delivery of opaque bytes to a subject
//! (optionally load-balanced across a queue group); this crate builds typed,
//! blocking, error-transparent calls on top of that.
//!
//! ## Architecture
//!
//! ```text
//! +---------------------------------------------------------------------+
//! |                  Generated surface (busrpc-gen)                     |
//! |   <Service>Server trait | <Service>Client | <service>_dispatcher()  |
//! +---------------------------------------------------------------------+
//! |          Client (call lifecycle)  |  Dispatcher (dispatch loop)     |
//! |   resolve -> encode -> publish -> |  subscribe -> decode -> route ->|
//! |   await reply/timeout/cancel      |  invoke (fault-contained) ->    |
//! |                                   |  encode -> reply                |
//! +---------------------------------------------------------------------+
//! |   Subject naming  |  Reply envelope (CRC framed)  |  Message codec  |
//! +---------------------------------------------------------------------+
//! |                 Transport trait  (MemoryBus, ...)                   |
//! +---------------------------------------------------------------------+
//! ```
//!
//! ## Subject Naming
//!
//! Method `SayHello` of service `Greeter` in the default namespace is
//! addressed as `default.Greeter.SayHello`. A routing key appends one more
//! token (`default.Greeter.SayHello.shard-3`) for point-to-point calls that
//! bypass queue-group load balancing.
//!
//! ## Example
//!
//! ```rust,ignore
//! let bus = Arc::new(MemoryBus::new());
//! let dispatcher = greeter::greeter_dispatcher(bus.clone(), Arc::new(MyGreeter), DispatcherConfig::default())?;
//! dispatcher.start().await?;
//!
//! let client = greeter::GreeterClient::new(bus, ClientConfig::default())?;
//! let reply = client.say_hello(&HelloRequest { name: "world".into() }, CallOptions::new()).await?;
//! ```

/// Client call runtime (publish, correlate, await with timeout, cancel).
pub mod client;
/// Client and dispatcher configuration.
pub mod config;
/// Service, method and message descriptors.
pub mod descriptor;
/// Wire envelope for request and reply frames.
pub mod envelope;
/// Error taxonomy.
pub mod error;
/// Payload marshaling for typed requests and responses.
pub mod message;
/// Instrumentation hook points.
pub mod observer;
/// Server dispatch runtime (method table, dispatcher).
pub mod server;
/// Deterministic subject naming.
pub mod subject;
/// Publish/subscribe transport abstraction and the in-process bus.
pub mod transport;

pub use async_trait::async_trait;
pub use serde;
pub use tokio_util::sync::CancellationToken;

pub use client::{CallOptions, Client};
pub use config::{ClientConfig, ConfigError, DispatcherConfig, RpcConfig};
pub use descriptor::{
    DescriptorError, DescriptorModel, FieldDescriptor, FieldKind, MessageDescriptor,
    MethodDescriptor, ServiceDescriptor, ServiceDescriptorBuilder,
};
pub use envelope::{DecodeError, ReplyEnvelope};
pub use error::{ApplicationError, ErrorCode, RpcError, RpcResult};
pub use message::{CodecError, Message};
pub use observer::{CallOutcome, NoopObserver, RpcObserver};
pub use server::{CallContext, Dispatcher, DispatcherState, MethodTable, MethodTableBuilder};
pub use subject::{InvalidNameError, NameKind, Subject, SubjectResolver};
pub use transport::{BusMessage, Headers, MemoryBus, Subscription, Transport, TransportError};
