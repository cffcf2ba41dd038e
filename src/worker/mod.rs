//! Worker node
//!
//! Accepts any number of inbound connections, transforms every message it
//! reads and, when a coordinator address is configured, relays the results
//! over an outbound link that reconnects on its own.

mod process;

pub use process::*;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::{dial_address, listen_address, FabricConfig};
use crate::connection::{ConnectionEvent, LinkConfig, Listener, OutboundLink, TcpConnector};
use crate::error::Result;
use crate::protocol::FrameCodec;
use crate::transform::{Transform, Uppercase};
use crate::types::{ConnectionState, WorkerSpec};

const EVENT_BUFFER: usize = 64;

/// Name of the relay link in logs and events
pub const RELAY_PEER: &str = "coordinator";

/// A worker with its listener bound but nothing running yet
pub struct WorkerNode {
    name: String,
    listener: Listener,
    codec: FrameCodec,
    link_config: LinkConfig,
    queue_capacity: usize,
    coordinator_addr: Option<String>,
    transform: Arc<dyn Transform>,
}

impl WorkerNode {
    /// Bind the worker listener from `[worker]` and `[connection]` settings
    pub async fn bind(config: &FabricConfig) -> Result<Self> {
        let listener = Listener::bind(&listen_address(&config.worker.listen_addr)).await?;
        Ok(Self {
            name: config.worker.resolved_name(),
            listener,
            codec: config.connection.codec(),
            link_config: config.connection.link_config(),
            queue_capacity: config.connection.queue_capacity,
            coordinator_addr: config.worker.coordinator_addr.as_deref().map(dial_address),
            transform: Arc::new(Uppercase),
        })
    }

    pub fn with_transform(mut self, transform: Arc<dyn Transform>) -> Self {
        self.transform = transform;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Spawn the accept loop, the processing loop and the relay link
    pub fn start(self) -> WorkerRuntime {
        let local_addr = self.listener.local_addr();
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (inbound_tx, inbound_rx) = mpsc::channel(self.queue_capacity.max(1));
        let processed = Arc::new(AtomicU64::new(0));
        let mut tasks = Vec::new();

        let (relay, relay_state) = match self.coordinator_addr {
            Some(ref addr) => {
                let link = OutboundLink::new(
                    WorkerSpec::new(RELAY_PEER, addr.clone()),
                    Arc::new(TcpConnector),
                    self.link_config,
                )
                .with_events(events.clone());
                let sender = link.sender();
                let state = link.state_handle();
                tasks.push(tokio::spawn(link.run()));
                (Some(sender), Some(state))
            }
            None => (None, None),
        };

        info!(
            worker = %self.name,
            addr = %local_addr,
            coordinator = ?self.coordinator_addr,
            framing = %self.codec.framing,
            transform = self.transform.name(),
            "Worker started"
        );

        tasks.push(tokio::spawn(
            self.listener.serve(self.codec, inbound_tx, Some(events.clone())),
        ));

        let worker = self.name.clone();
        let counter = Arc::clone(&processed);
        let transform = self.transform;
        tasks.push(tokio::spawn(async move {
            process_loop(worker, inbound_rx, transform, relay, counter).await;
        }));

        WorkerRuntime {
            name: self.name,
            local_addr,
            processed,
            relay_state,
            events,
            tasks,
        }
    }
}

/// Handles to a running worker
pub struct WorkerRuntime {
    name: String,
    local_addr: SocketAddr,
    processed: Arc<AtomicU64>,
    relay_state: Option<Arc<RwLock<ConnectionState>>>,
    events: broadcast::Sender<ConnectionEvent>,
    tasks: Vec<JoinHandle<()>>,
}

impl WorkerRuntime {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Messages processed so far
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Relaxed)
    }

    /// State of the link to the coordinator, if one is configured
    pub fn relay_state(&self) -> Option<ConnectionState> {
        self.relay_state.as_ref().map(|state| *state.read())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Stop every loop and close all sockets
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        info!(worker = %self.name, processed = self.processed(), "Worker stopped");
    }
}
