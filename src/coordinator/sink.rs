//! Sink for results relayed back by workers

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use crate::connection::Inbound;

/// Log every result and republish it to `tap` subscribers.
///
/// Returns the number of results received once the listener is gone.
pub async fn run_result_sink(
    mut results: mpsc::Receiver<Inbound>,
    tap: broadcast::Sender<Inbound>,
) -> u64 {
    let mut received = 0u64;

    while let Some(result) = results.recv().await {
        received += 1;
        info!(
            from = %result.peer_addr,
            connection_id = result.connection_id,
            bytes = result.payload.len(),
            result = %String::from_utf8_lossy(&result.payload),
            "Received result from worker"
        );
        let _ = tap.send(result);
    }

    received
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[tokio::test]
    async fn test_sink_counts_and_republishes() {
        let (tx, rx) = mpsc::channel(4);
        let (tap, mut tap_rx) = broadcast::channel(4);

        tx.send(Inbound {
            peer_addr: "127.0.0.1:6000".parse().unwrap(),
            connection_id: 3,
            payload: Bytes::from_static(b"FOO"),
        })
        .await
        .unwrap();
        drop(tx);

        assert_eq!(run_result_sink(rx, tap).await, 1);
        assert_eq!(tap_rx.recv().await.unwrap().payload, &b"FOO"[..]);
    }
}
