//! Dispatcher: ingress queue → one randomly selected live worker
//!
//! Every task is forwarded to exactly one worker. The choice is made by the
//! registry against the workers connected at that moment, so a worker that
//! registers late is picked up and a worker that disconnects stops receiving
//! work. Forwarding is fire-and-forget; a task handed to a worker whose
//! connection then breaks is lost.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::registry::RegistryHandle;
use crate::types::Task;

/// Counters kept by a dispatch loop
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Tasks pushed onto a worker queue
    pub dispatched: u64,
    /// Tasks whose selected worker queue was already closed
    pub dropped: u64,
    /// Dispatched tasks per worker name
    pub per_worker: BTreeMap<String, u64>,
}

pub struct Dispatcher {
    registry: RegistryHandle,
}

impl Dispatcher {
    pub fn new(registry: RegistryHandle) -> Self {
        Self { registry }
    }

    /// Drain `ingress` in arrival order until it closes.
    ///
    /// Waits while no worker is registered. Returns early if the registry
    /// task is gone.
    pub async fn run(self, mut ingress: mpsc::Receiver<Task>) -> DispatchStats {
        let mut stats = DispatchStats::default();
        info!("Dispatcher started");

        while let Some(task) = ingress.recv().await {
            let worker = match self.registry.select().await {
                Ok(worker) => worker,
                Err(e) => {
                    warn!(error = %e, "Registry unavailable, dispatcher stopping");
                    stats.dropped += 1;
                    break;
                }
            };

            let bytes = task.len();
            match worker.forward(task).await {
                Ok(()) => {
                    debug!(
                        worker = %worker.name,
                        connection_id = worker.connection_id,
                        bytes,
                        "Dispatched task"
                    );
                    stats.dispatched += 1;
                    *stats.per_worker.entry(worker.name.clone()).or_insert(0) += 1;
                }
                Err(e) => {
                    warn!(worker = %worker.name, bytes, error = %e, "Task lost");
                    stats.dropped += 1;
                }
            }
        }

        info!(
            dispatched = stats.dispatched,
            dropped = stats.dropped,
            "Dispatcher stopped"
        );
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::RwLock;

    use crate::registry::{WorkerHandle, WorkerRegistry};
    use crate::types::ConnectionState;

    fn make_handle(name: &str, id: u64, capacity: usize) -> (WorkerHandle, mpsc::Receiver<Task>) {
        let (tx, rx) = mpsc::channel(capacity);
        let state = Arc::new(RwLock::new(ConnectionState::Connected));
        (WorkerHandle::new(name, "127.0.0.1:0", id, tx, state), rx)
    }

    #[tokio::test]
    async fn test_selection_is_uniform() {
        const WORKERS: usize = 4;
        const TASKS: usize = 8000;

        let registry = WorkerRegistry::with_seed(42).spawn();
        let mut queues = Vec::new();
        for i in 0..WORKERS {
            let (handle, rx) = make_handle(&format!("w{}", i), i as u64 + 1, TASKS);
            registry.register(handle).await.unwrap();
            queues.push(rx);
        }

        let (ingress_tx, ingress_rx) = mpsc::channel(64);
        tokio::spawn(async move {
            for _ in 0..TASKS {
                ingress_tx.send(Task::from("foo")).await.unwrap();
            }
        });

        let stats = Dispatcher::new(registry).run(ingress_rx).await;
        assert_eq!(stats.dispatched, TASKS as u64);
        assert_eq!(stats.dropped, 0);

        let expected = (TASKS / WORKERS) as u64;
        let tolerance = expected / 10;
        for (i, rx) in queues.iter().enumerate() {
            let count = stats.per_worker[&format!("w{}", i)];
            assert!(
                count.abs_diff(expected) <= tolerance,
                "w{} received {} tasks, expected about {}",
                i,
                count,
                expected
            );
            assert_eq!(rx.len() as u64, count);
        }
    }

    #[tokio::test]
    async fn test_waits_for_first_worker() {
        let registry = WorkerRegistry::with_seed(1).spawn();
        let (ingress_tx, ingress_rx) = mpsc::channel(4);
        ingress_tx.send(Task::from("foo")).await.unwrap();

        let dispatcher = tokio::spawn(Dispatcher::new(registry.clone()).run(ingress_rx));
        tokio::time::sleep(Duration::from_millis(50)).await;

        let (handle, mut rx) = make_handle("late", 1, 4);
        registry.register(handle).await.unwrap();

        let task = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(task, Task::from("foo"));

        drop(ingress_tx);
        let stats = dispatcher.await.unwrap();
        assert_eq!(stats.per_worker.get("late"), Some(&1));
    }

    #[tokio::test]
    async fn test_closed_worker_queue_counts_as_dropped() {
        let registry = WorkerRegistry::with_seed(1).spawn();
        let (handle, rx) = make_handle("w1", 1, 4);
        registry.register(handle).await.unwrap();
        drop(rx);

        let (ingress_tx, ingress_rx) = mpsc::channel(4);
        ingress_tx.send(Task::from("foo")).await.unwrap();
        drop(ingress_tx);

        let stats = Dispatcher::new(registry).run(ingress_rx).await;
        assert_eq!(stats.dispatched, 0);
        assert_eq!(stats.dropped, 1);
    }
}
