// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Server dispatch runtime.
//!
//! A [`Dispatcher`] binds a [`MethodTable`] to a transport:
//!
//! - **Subscribe**: `<ns>.<service>.*` inside the service's queue group, plus
//!   `<ns>.<service>.*.<routing_key>` when the instance has a routing key
//! - **Per message**: decode, route by method token, invoke under a panic
//!   boundary, encode the reply and publish it to the reply subject
//! - **Stop**: unsubscribe, cancel the call contexts, wait for in-flight
//!   invocations
//!
//! # Example
//!
//! ```rust,ignore
//! let table = MethodTable::builder(descriptor)
//!     .unary("Echo", |_ctx, request: EchoRequest| async move { Ok(EchoReply { text: request.text }) })
//!     .build()?;
//! let dispatcher = Dispatcher::new(bus, table, DispatcherConfig::default())?;
//! dispatcher.start().await?;
//! ```

mod context;
mod dispatcher;
mod table;

pub use context::CallContext;
pub use dispatcher::{Dispatcher, DispatcherState};
pub use table::{MethodTable, MethodTableBuilder};
