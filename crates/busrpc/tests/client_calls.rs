// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test code readability over pedantic
#![allow(clippy::missing_panics_doc)] // Tests panic on failure
#![allow(clippy::wildcard_imports)] // Test utility imports
#![allow(clippy::cast_possible_truncation)] // Test parameters

//! Client call lifecycle: correlation, timeout, cancellation, local errors.

mod support;

use busrpc::{
    CallOptions, CallOutcome, CancellationToken, Client, Dispatcher, ErrorCode, RpcError,
    RpcObserver,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use support::*;

#[derive(Default)]
struct CountingObserver {
    started: AtomicUsize,
    timeouts: AtomicUsize,
    late: AtomicUsize,
}

impl RpcObserver for CountingObserver {
    fn call_started(&self, _subject: &str) {
        self.started.fetch_add(1, Ordering::SeqCst);
    }

    fn call_finished(&self, _subject: &str, outcome: CallOutcome, _elapsed: Duration) {
        if outcome == CallOutcome::Timeout {
            self.timeouts.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn late_reply_discarded(&self, _reply_subject: &str) {
        self.late.fetch_add(1, Ordering::SeqCst);
    }
}

async fn lab_dispatcher(bus: &Arc<busrpc::MemoryBus>) -> (Dispatcher<busrpc::MemoryBus>, Arc<Lab>) {
    let lab = Lab::new();
    let dispatcher = Dispatcher::new(Arc::clone(bus), lab_table(&lab), dispatcher_config()).unwrap();
    dispatcher.start().await.unwrap();
    (dispatcher, lab)
}

fn probe(id: u64, delay_ms: u64) -> Probe {
    Probe { id, delay_ms }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_do_not_cross_talk() {
    let bus = bus();
    let (dispatcher, lab) = lab_dispatcher(&bus).await;
    let client = Client::new(Arc::clone(&bus), lab_descriptor(), client_config()).unwrap();

    let mut rng = fastrand::Rng::with_seed(7);
    let calls = (0..100u64).map(|id| {
        let request = probe(id, rng.u64(0..20));
        let client = &client;
        async move {
            let reply: Probe = client.call("Echo", &request, CallOptions::new()).await.unwrap();
            (id, reply)
        }
    });

    for (id, reply) in futures::future::join_all(calls).await {
        assert_eq!(reply.id, id, "reply for call {} carried id {}", id, reply.id);
    }
    assert_eq!(lab.handled.load(Ordering::SeqCst), 100);
    assert_eq!(client.pending_calls(), 0);

    dispatcher.stop().await;
}

#[tokio::test]
async fn test_timeout_then_late_reply_is_discarded() {
    let bus = bus();
    let (dispatcher, lab) = lab_dispatcher(&bus).await;
    let observer = Arc::new(CountingObserver::default());
    let client = Client::with_observer(
        Arc::clone(&bus),
        lab_descriptor(),
        client_config(),
        Arc::clone(&observer) as Arc<dyn RpcObserver>,
    )
    .unwrap();

    let started = Instant::now();
    let err = client
        .call::<Probe, Probe>(
            "Echo",
            &probe(1, 200),
            CallOptions::new().with_timeout(Duration::from_millis(50)),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Timeout(d) if d == Duration::from_millis(50)));
    assert!(started.elapsed() < Duration::from_millis(190));
    assert_eq!(client.pending_calls(), 0);
    assert_eq!(observer.timeouts.load(Ordering::SeqCst), 1);

    // The dispatcher still answers; the reply must be dropped quietly.
    assert!(eventually(|| observer.late.load(Ordering::SeqCst) == 1).await);
    assert_eq!(lab.handled.load(Ordering::SeqCst), 1);

    // The client stays usable.
    let reply: Probe = client
        .call("Echo", &probe(2, 0), CallOptions::new())
        .await
        .unwrap();
    assert_eq!(reply.id, 2);
    assert_eq!(observer.started.load(Ordering::SeqCst), 2);

    dispatcher.stop().await;
}

#[tokio::test]
async fn test_deadline_option() {
    let bus = bus();
    let (dispatcher, _lab) = lab_dispatcher(&bus).await;
    let client = Client::new(Arc::clone(&bus), lab_descriptor(), client_config()).unwrap();

    let deadline = Instant::now() + Duration::from_millis(40);
    let err = client
        .call::<Probe, Probe>("Echo", &probe(1, 500), CallOptions::new().with_deadline(deadline))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    dispatcher.stop().await;
}

#[tokio::test]
async fn test_cancellation_aborts_waiting_call() {
    let bus = bus();
    let (dispatcher, _lab) = lab_dispatcher(&bus).await;
    let client = Client::new(Arc::clone(&bus), lab_descriptor(), client_config()).unwrap();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let err = client
        .call::<Probe, Probe>("Slow", &probe(1, 1_000), CallOptions::new().with_cancellation(token))
        .await
        .unwrap_err();

    assert!(err.is_canceled());
    assert!(started.elapsed() < Duration::from_millis(900));
    assert_eq!(client.pending_calls(), 0);

    dispatcher.stop().await;
}

#[tokio::test]
async fn test_dropped_call_future_releases_pending_entry() {
    let bus = bus();
    let (dispatcher, _lab) = lab_dispatcher(&bus).await;
    let client = Client::new(Arc::clone(&bus), lab_descriptor(), client_config()).unwrap();

    let slow_probe = probe(1, 500);
    let call = client.call::<Probe, Probe>("Slow", &slow_probe, CallOptions::new());
    let outcome = tokio::time::timeout(Duration::from_millis(30), call).await;
    assert!(outcome.is_err());
    assert_eq!(client.pending_calls(), 0);

    dispatcher.stop().await;
}

struct Unencodable;

impl Serialize for Unencodable {
    fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
        Err(serde::ser::Error::custom("refusing to encode"))
    }
}

impl<'de> Deserialize<'de> for Unencodable {
    fn deserialize<D: serde::Deserializer<'de>>(_deserializer: D) -> Result<Self, D::Error> {
        Ok(Self)
    }
}

#[tokio::test]
async fn test_encode_failure_publishes_nothing() {
    let bus = bus();
    let client = Client::new(Arc::clone(&bus), lab_descriptor(), client_config()).unwrap();

    let err = client
        .call::<Unencodable, Probe>("Echo", &Unencodable, CallOptions::new())
        .await
        .unwrap_err();

    assert!(matches!(err, RpcError::Encode(_)));
    assert_eq!(bus.published(), 0);
    assert_eq!(client.pending_calls(), 0);
}

#[tokio::test]
async fn test_response_decode_failure() {
    let bus = bus();
    let (dispatcher, _lab) = lab_dispatcher(&bus).await;
    let client = Client::new(Arc::clone(&bus), lab_descriptor(), client_config()).unwrap();

    // The dispatcher answers with a Probe; asking for a String must fail
    // locally as a decode error.
    let err = client
        .call::<Probe, String>("Echo", &probe(1, 0), CallOptions::new())
        .await
        .unwrap_err();
    assert!(matches!(err, RpcError::Decode(_)));

    dispatcher.stop().await;
}

#[tokio::test]
async fn test_bad_request_is_reported() {
    let bus = bus();
    let (dispatcher, lab) = lab_dispatcher(&bus).await;
    let client = Client::new(Arc::clone(&bus), lab_descriptor(), client_config()).unwrap();

    let err = client
        .call_raw("Echo", Bytes::from_static(b"not json"), CallOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.remote_code(), Some(ErrorCode::BadRequest));
    assert_eq!(lab.handled.load(Ordering::SeqCst), 0);

    dispatcher.stop().await;
}
