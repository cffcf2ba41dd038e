//! Worker registry: name → live worker handle
//!
//! The mapping is owned by a single task. Everything else talks to it through
//! a cloneable [`RegistryHandle`], so registrations, removals and dispatch-time
//! selection are serialized without a shared lock.
//!
//! A handle is present only while its connection is up: links register after
//! a successful dial and unregister when the connection breaks.

use std::collections::{BTreeMap, VecDeque};
use std::sync::Arc;

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::types::{ConnectionState, Task};

const COMMAND_BUFFER: usize = 64;

// ─────────────────────────────────────────────────────────────────
// Worker Handle
// ─────────────────────────────────────────────────────────────────

/// A connected worker as seen by the dispatcher
#[derive(Debug, Clone)]
pub struct WorkerHandle {
    pub name: String,
    pub remote_addr: String,
    /// Identifies the connection this handle was registered for
    pub connection_id: u64,
    outbound: mpsc::Sender<Task>,
    state: Arc<RwLock<ConnectionState>>,
}

impl WorkerHandle {
    pub fn new(
        name: impl Into<String>,
        remote_addr: impl Into<String>,
        connection_id: u64,
        outbound: mpsc::Sender<Task>,
        state: Arc<RwLock<ConnectionState>>,
    ) -> Self {
        Self {
            name: name.into(),
            remote_addr: remote_addr.into(),
            connection_id,
            outbound,
            state,
        }
    }

    /// Push a task onto this worker's outbound queue.
    ///
    /// Blocks while the queue is full. No acknowledgment is awaited; once the
    /// task is queued, delivery is best-effort.
    pub async fn forward(&self, task: Task) -> Result<()> {
        self.outbound
            .send(task)
            .await
            .map_err(|_| Error::ChannelClosed(format!("outbound queue of worker {}", self.name)))
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }
}

// ─────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────

/// Requests served by the registry task
#[derive(Debug)]
pub enum RegistryCommand {
    /// Insert or replace a worker; replies whether a previous entry was replaced
    Register {
        handle: WorkerHandle,
        reply: oneshot::Sender<bool>,
    },

    /// Remove a worker if it is still registered for `connection_id`
    Unregister {
        name: String,
        connection_id: u64,
        reply: oneshot::Sender<bool>,
    },

    /// Pick one live worker uniformly at random, waiting while none is registered
    Select { reply: oneshot::Sender<WorkerHandle> },

    /// Names of all live workers
    Names { reply: oneshot::Sender<Vec<String>> },

    /// Number of live workers
    Len { reply: oneshot::Sender<usize> },
}

// ─────────────────────────────────────────────────────────────────
// Registry Task
// ─────────────────────────────────────────────────────────────────

/// State owned by the registry task
pub struct WorkerRegistry {
    workers: BTreeMap<String, WorkerHandle>,
    waiting: VecDeque<oneshot::Sender<WorkerHandle>>,
    rng: StdRng,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// Deterministic selection for tests and reproducible runs
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            workers: BTreeMap::new(),
            waiting: VecDeque::new(),
            rng,
        }
    }

    /// Start the registry task and return a handle to it.
    ///
    /// The task ends when every handle has been dropped.
    pub fn spawn(self) -> RegistryHandle {
        let (tx, rx) = mpsc::channel(COMMAND_BUFFER);
        tokio::spawn(self.run(rx));
        RegistryHandle { tx }
    }

    async fn run(mut self, mut rx: mpsc::Receiver<RegistryCommand>) {
        while let Some(cmd) = rx.recv().await {
            self.handle(cmd);
        }
        debug!("Registry task stopped");
    }

    fn handle(&mut self, cmd: RegistryCommand) {
        match cmd {
            RegistryCommand::Register { handle, reply } => {
                let name = handle.name.clone();
                let connection_id = handle.connection_id;
                let replaced = self.workers.insert(name.clone(), handle).is_some();
                info!(
                    worker = %name,
                    connection_id,
                    replaced,
                    live = self.workers.len(),
                    "Worker registered"
                );
                let _ = reply.send(replaced);
                self.serve_waiting();
            }
            RegistryCommand::Unregister {
                name,
                connection_id,
                reply,
            } => {
                let current = self
                    .workers
                    .get(&name)
                    .map(|h| h.connection_id == connection_id)
                    .unwrap_or(false);
                if current {
                    self.workers.remove(&name);
                    info!(
                        worker = %name,
                        connection_id,
                        live = self.workers.len(),
                        "Worker unregistered"
                    );
                } else {
                    debug!(worker = %name, connection_id, "Stale unregister ignored");
                }
                let _ = reply.send(current);
            }
            RegistryCommand::Select { reply } => match self.pick() {
                Some(handle) => {
                    let _ = reply.send(handle);
                }
                None => {
                    debug!(waiting = self.waiting.len() + 1, "No live workers, selection parked");
                    self.waiting.push_back(reply);
                }
            },
            RegistryCommand::Names { reply } => {
                let _ = reply.send(self.workers.keys().cloned().collect());
            }
            RegistryCommand::Len { reply } => {
                let _ = reply.send(self.workers.len());
            }
        }
    }

    /// Uniform choice over the workers registered right now
    fn pick(&mut self) -> Option<WorkerHandle> {
        if self.workers.is_empty() {
            return None;
        }
        let idx = self.rng.gen_range(0..self.workers.len());
        self.workers.values().nth(idx).cloned()
    }

    fn serve_waiting(&mut self) {
        while !self.waiting.is_empty() {
            let Some(handle) = self.pick() else { return };
            if let Some(waiter) = self.waiting.pop_front() {
                // A waiter whose caller gave up is simply skipped
                let _ = waiter.send(handle);
            }
        }
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────
// Handle
// ─────────────────────────────────────────────────────────────────

/// Cloneable client of the registry task
#[derive(Debug, Clone)]
pub struct RegistryHandle {
    tx: mpsc::Sender<RegistryCommand>,
}

impl RegistryHandle {
    /// Spawn a registry with an entropy-seeded RNG
    pub fn spawn() -> Self {
        WorkerRegistry::new().spawn()
    }

    pub async fn register(&self, handle: WorkerHandle) -> Result<bool> {
        self.request(|reply| RegistryCommand::Register { handle, reply }).await
    }

    pub async fn unregister(&self, name: &str, connection_id: u64) -> Result<bool> {
        self.request(|reply| RegistryCommand::Unregister {
            name: name.to_string(),
            connection_id,
            reply,
        })
        .await
    }

    /// Select a live worker, waiting until at least one is registered
    pub async fn select(&self) -> Result<WorkerHandle> {
        self.request(|reply| RegistryCommand::Select { reply }).await
    }

    pub async fn names(&self) -> Result<Vec<String>> {
        self.request(|reply| RegistryCommand::Names { reply }).await
    }

    pub async fn len(&self) -> Result<usize> {
        self.request(|reply| RegistryCommand::Len { reply }).await
    }

    pub async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> RegistryCommand,
    ) -> Result<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(make(reply_tx))
            .await
            .map_err(|_| Error::RegistryClosed)?;
        reply_rx.await.map_err(|_| Error::RegistryClosed)
    }
}

// ─────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────
