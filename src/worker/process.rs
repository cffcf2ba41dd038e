//! Worker processing loop

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::connection::Inbound;
use crate::transform::Transform;
use crate::types::Task;

/// Apply `transform` to every inbound message and relay the result.
///
/// Without a relay (or once the relay queue is gone) results are only
/// logged. Runs until every reader loop and the listener have dropped their
/// inbound senders. Returns the number of messages processed.
pub async fn process_loop(
    worker: String,
    mut inbound: mpsc::Receiver<Inbound>,
    transform: Arc<dyn Transform>,
    mut relay: Option<mpsc::Sender<Task>>,
    processed: Arc<AtomicU64>,
) -> u64 {
    let mut count = 0u64;

    while let Some(msg) = inbound.recv().await {
        let result = transform.apply(&msg.payload);
        count += 1;
        processed.fetch_add(1, Ordering::Relaxed);

        info!(
            worker = %worker,
            from = %msg.peer_addr,
            connection_id = msg.connection_id,
            bytes = msg.payload.len(),
            transform = transform.name(),
            result = %String::from_utf8_lossy(&result),
            "Processed task"
        );

        match relay {
            Some(ref tx) => {
                if tx.send(Task::from(result)).await.is_err() {
                    warn!(worker = %worker, "Relay queue closed, results will only be logged");
                    relay = None;
                }
            }
            None => debug!(worker = %worker, "No coordinator configured, result discarded"),
        }
    }

    info!(worker = %worker, processed = count, "Processing loop stopped");
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    use crate::transform::Uppercase;

    fn inbound(payload: &'static str) -> Inbound {
        Inbound {
            peer_addr: "127.0.0.1:5000".parse().unwrap(),
            connection_id: 1,
            payload: Bytes::from_static(payload.as_bytes()),
        }
    }

    #[tokio::test]
    async fn test_transforms_and_relays_in_order() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (relay_tx, mut relay_rx) = mpsc::channel(8);
        let processed = Arc::new(AtomicU64::new(0));

        for word in ["foo", "bar", "baz"] {
            in_tx.send(inbound(word)).await.unwrap();
        }
        drop(in_tx);

        let count = process_loop(
            "w1".into(),
            in_rx,
            Arc::new(Uppercase),
            Some(relay_tx),
            Arc::clone(&processed),
        )
        .await;

        assert_eq!(count, 3);
        assert_eq!(processed.load(Ordering::Relaxed), 3);
        for expected in ["FOO", "BAR", "BAZ"] {
            assert_eq!(relay_rx.recv().await.unwrap(), Task::from(expected));
        }
    }

    #[tokio::test]
    async fn test_keeps_processing_after_relay_closes() {
        let (in_tx, in_rx) = mpsc::channel(8);
        let (relay_tx, relay_rx) = mpsc::channel(8);
        drop(relay_rx);
        let processed = Arc::new(AtomicU64::new(0));

        in_tx.send(inbound("foo")).await.unwrap();
        in_tx.send(inbound("bar")).await.unwrap();
        drop(in_tx);

        let count =
            process_loop("w1".into(), in_rx, Arc::new(Uppercase), Some(relay_tx), processed).await;
        assert_eq!(count, 2);
    }
}
