//! End-to-end tests over loopback TCP
//!
//! Each test runs a coordinator and real workers inside the test runtime.

mod common;

use std::time::Duration;

use bytes::Bytes;
use taskfabric::connection::{CloseReason, ConnectionEvent};
use taskfabric::protocol::Framing;
use taskfabric::{ConnectionState, Coordinator, Task, WorkerNode, WorkerRuntime, WorkerSpec};
use tokio::net::TcpListener;

use common::{loopback_config, wait_until};

const TIMEOUT: Duration = Duration::from_secs(10);

async fn start_worker(
    name: &str,
    framing: Framing,
    coordinator_addr: Option<String>,
) -> WorkerRuntime {
    let mut config = loopback_config(framing);
    config.worker.name = Some(name.to_string());
    config.worker.coordinator_addr = coordinator_addr;
    WorkerNode::bind(&config).await.unwrap().start()
}

#[tokio::test]
async fn test_tasks_fan_out_and_results_come_back() {
    let config = loopback_config(Framing::LengthPrefixed);
    let coordinator = Coordinator::bind(&config).await.unwrap();
    let coordinator_addr = coordinator.local_addr().to_string();

    let w1 = start_worker("w1", Framing::LengthPrefixed, Some(coordinator_addr.clone())).await;
    let w2 = start_worker("w2", Framing::LengthPrefixed, Some(coordinator_addr)).await;

    let runtime = coordinator.start(vec![
        WorkerSpec::new("w1", w1.local_addr().to_string()),
        WorkerSpec::new("w2", w2.local_addr().to_string()),
    ]);
    let mut results = runtime.subscribe_results();
    let registry = runtime.registry();

    assert!(wait_until(TIMEOUT, || async { registry.len().await.unwrap() == 2 }).await);
    assert!(runtime
        .link_states()
        .values()
        .all(|state| *state == ConnectionState::Connected));

    let ingress = runtime.ingress();
    for word in ["foo", "bar", "baz"] {
        ingress.send(Task::from(word)).await.unwrap();
    }

    let mut received = Vec::new();
    for _ in 0..3 {
        let result = tokio::time::timeout(TIMEOUT, results.recv()).await.unwrap().unwrap();
        received.push(result.payload);
    }
    received.sort();
    assert_eq!(
        received,
        vec![
            Bytes::from_static(b"BAR"),
            Bytes::from_static(b"BAZ"),
            Bytes::from_static(b"FOO"),
        ]
    );

    // Each task went to exactly one worker and was transformed once
    assert_eq!(w1.processed() + w2.processed(), 3);

    runtime.shutdown();
    w1.shutdown();
    w2.shutdown();
}

#[tokio::test]
async fn test_disconnected_worker_is_no_longer_selected() {
    let config = loopback_config(Framing::LengthPrefixed);
    let coordinator = Coordinator::bind(&config).await.unwrap();

    let w1 = start_worker("w1", Framing::LengthPrefixed, None).await;
    let flaky = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let flaky_addr = flaky.local_addr().unwrap().to_string();

    let runtime = coordinator.start(vec![
        WorkerSpec::new("w1", w1.local_addr().to_string()),
        WorkerSpec::new("w2", flaky_addr),
    ]);
    let mut events = runtime.subscribe_events();
    let registry = runtime.registry();

    let (socket, _) = tokio::time::timeout(TIMEOUT, flaky.accept()).await.unwrap().unwrap();
    assert!(wait_until(TIMEOUT, || async { registry.len().await.unwrap() == 2 }).await);

    // Hang up and stop listening so redials are refused
    drop(socket);
    drop(flaky);

    let reason = tokio::time::timeout(TIMEOUT, async {
        loop {
            if let Ok(ConnectionEvent::Closed { peer, reason, .. }) = events.recv().await {
                if peer == "w2" {
                    return reason;
                }
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(reason, CloseReason::PeerClosed);
    assert_eq!(registry.names().await.unwrap(), vec!["w1".to_string()]);

    let ingress = runtime.ingress();
    for _ in 0..20 {
        ingress.send(Task::from("foo")).await.unwrap();
    }
    assert!(wait_until(TIMEOUT, || async { w1.processed() == 20 }).await);
    assert_ne!(runtime.link_states()["w2"], ConnectionState::Connected);

    runtime.shutdown();
    w1.shutdown();
}

#[tokio::test]
async fn test_worker_registered_late_receives_tasks() {
    let config = loopback_config(Framing::LengthPrefixed);
    let coordinator = Coordinator::bind(&config).await.unwrap();

    // Reserve an address, free it, and only start the worker there later
    let reserved = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let late_addr = reserved.local_addr().unwrap();
    drop(reserved);

    let runtime = coordinator.start(vec![WorkerSpec::new("late", late_addr.to_string())]);
    let ingress = runtime.ingress();
    ingress.send(Task::from("foo")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(runtime.registry().is_empty().await.unwrap());

    let mut worker_config = loopback_config(Framing::LengthPrefixed);
    worker_config.worker.listen_addr = late_addr.to_string();
    let late = WorkerNode::bind(&worker_config).await.unwrap().start();

    assert!(wait_until(TIMEOUT, || async { late.processed() == 1 }).await);

    runtime.shutdown();
    late.shutdown();
}

#[tokio::test]
async fn test_raw_framing_round_trip() {
    let config = loopback_config(Framing::Raw);
    let coordinator = Coordinator::bind(&config).await.unwrap();
    let w1 = start_worker("w1", Framing::Raw, Some(coordinator.local_addr().to_string())).await;

    let runtime = coordinator.start(vec![WorkerSpec::new("w1", w1.local_addr().to_string())]);
    let mut results = runtime.subscribe_results();
    let registry = runtime.registry();
    assert!(wait_until(TIMEOUT, || async { registry.len().await.unwrap() == 1 }).await);

    runtime.ingress().send(Task::from("foobaz")).await.unwrap();

    let result = tokio::time::timeout(TIMEOUT, results.recv()).await.unwrap().unwrap();
    assert_eq!(result.payload, &b"FOOBAZ"[..]);
    assert_eq!(w1.relay_state(), Some(ConnectionState::Connected));

    runtime.shutdown();
    w1.shutdown();
}
