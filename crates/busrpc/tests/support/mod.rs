// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Shared fixtures for integration tests.
//!
//! `messages` and `greeter` are `busrpc-gen` output for
//! `tests/generated/greeter/greeter.yaml`, checked in and compiled as is. The
//! generator's own tests fail when the checked-in files go stale.

#![allow(dead_code)]

use busrpc::{
    ApplicationError, CallContext, ClientConfig, DispatcherConfig, MemoryBus, MethodTable,
    ServiceDescriptor,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[rustfmt::skip]
#[path = "../generated/greeter/messages.rs"]
pub mod messages;

#[rustfmt::skip]
#[path = "../generated/greeter/greeter.rs"]
pub mod greeter;

/// Greeter implementation used across tests.
#[derive(Default)]
pub struct Greeter {
    pub calls: AtomicUsize,
}

#[busrpc::async_trait]
impl greeter::GreeterServer for Greeter {
    async fn say_hello(
        &self,
        _ctx: CallContext,
        request: messages::HelloRequest,
    ) -> Result<messages::HelloReply, ApplicationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if request.name.is_empty() {
            return Err(ApplicationError::new("name required"));
        }
        Ok(messages::HelloReply {
            message: format!("Hello {}", request.name),
        })
    }
}

pub fn hello(name: &str) -> messages::HelloRequest {
    messages::HelloRequest {
        name: name.to_string(),
    }
}

/// Payload of the `Lab` test service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Probe {
    pub id: u64,
    #[serde(default)]
    pub delay_ms: u64,
}

/// `Lab` exercises the dispatcher edge cases:
/// - `Echo` answers with the request after `delay_ms`
/// - `Panic` panics (for any id but `u64::MAX`)
/// - `Slow` sleeps `delay_ms`, counting concurrent invocations
pub struct Lab {
    pub running: AtomicUsize,
    pub peak: AtomicUsize,
    pub handled: AtomicUsize,
}

impl Lab {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            handled: AtomicUsize::new(0),
        })
    }
}

pub fn lab_descriptor() -> ServiceDescriptor {
    ServiceDescriptor::builder("Lab")
        .method("Echo", "support::Probe", "support::Probe")
        .method("Panic", "support::Probe", "support::Probe")
        .method("Slow", "support::Probe", "support::Probe")
        .build()
        .unwrap()
}

pub fn lab_table(lab: &Arc<Lab>) -> MethodTable {
    let echo = Arc::clone(lab);
    let slow = Arc::clone(lab);
    MethodTable::builder(lab_descriptor())
        .unary("Echo", move |_ctx: CallContext, probe: Probe| {
            let lab = Arc::clone(&echo);
            async move {
                if probe.delay_ms > 0 {
                    tokio::time::sleep(Duration::from_millis(probe.delay_ms)).await;
                }
                lab.handled.fetch_add(1, Ordering::SeqCst);
                Ok(probe)
            }
        })
        .unary("Panic", |_ctx: CallContext, probe: Probe| async move {
            if probe.id != u64::MAX {
                panic!("lab panic {}", probe.id);
            }
            Ok(probe)
        })
        .unary("Slow", move |_ctx: CallContext, probe: Probe| {
            let lab = Arc::clone(&slow);
            async move {
                let now = lab.running.fetch_add(1, Ordering::SeqCst) + 1;
                lab.peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(probe.delay_ms)).await;
                lab.running.fetch_sub(1, Ordering::SeqCst);
                lab.handled.fetch_add(1, Ordering::SeqCst);
                Ok(probe)
            }
        })
        .build()
        .unwrap()
}

pub fn bus() -> Arc<MemoryBus> {
    Arc::new(MemoryBus::new())
}

pub fn client_config() -> ClientConfig {
    ClientConfig::default().default_timeout(Duration::from_secs(5))
}

pub fn dispatcher_config() -> DispatcherConfig {
    DispatcherConfig::default()
}

/// Poll `condition` until it holds, for at most two seconds.
pub async fn eventually(condition: impl Fn() -> bool) -> bool {
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}
