//! Outbound link supervisor
//!
//! One link per configured peer. The link owns the outbound queue for that
//! peer and cycles through dial → connected → failed for as long as the
//! queue can still receive tasks:
//!
//! 1. dial with fixed-interval retry
//! 2. register the worker and run the writer loop
//! 3. on a broken connection: unregister, close the socket, dial again
//!
//! Tasks still sitting in the queue when a connection breaks are discarded
//! and counted in the log. Only tasks queued after the break reach the next
//! connection.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tracing::{info, warn};

use super::dial::{dial_with_retry, Connector, DialOutcome, DEFAULT_RECONNECT_INTERVAL};
use super::writer::{write_loop, WriterExit};
use super::{next_connection_id, CloseReason, ConnectionEvent, Direction};
use crate::protocol::FrameCodec;
use crate::registry::{RegistryHandle, WorkerHandle};
use crate::types::{ConnectionState, Task, WorkerSpec};

/// Default outbound queue capacity per link
pub const DEFAULT_QUEUE_CAPACITY: usize = 10;

/// Tuning for one outbound link
#[derive(Debug, Clone, Copy)]
pub struct LinkConfig {
    pub codec: FrameCodec,
    pub reconnect_interval: Duration,
    pub queue_capacity: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            codec: FrameCodec::default(),
            reconnect_interval: DEFAULT_RECONNECT_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Supervises the connection to a single peer
pub struct OutboundLink<C: Connector> {
    spec: WorkerSpec,
    connector: Arc<C>,
    config: LinkConfig,
    state: Arc<RwLock<ConnectionState>>,
    tx: mpsc::Sender<Task>,
    rx: mpsc::Receiver<Task>,
    registry: Option<RegistryHandle>,
    events: Option<broadcast::Sender<ConnectionEvent>>,
}

impl<C: Connector> OutboundLink<C> {
    pub fn new(spec: WorkerSpec, connector: Arc<C>, config: LinkConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        Self {
            spec,
            connector,
            config,
            state: Arc::new(RwLock::new(ConnectionState::Dialing)),
            tx,
            rx,
            registry: None,
            events: None,
        }
    }

    /// Register the peer in `registry` while connected.
    ///
    /// A registered link keeps its queue open and runs until aborted.
    pub fn with_registry(mut self, registry: RegistryHandle) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn with_events(mut self, events: broadcast::Sender<ConnectionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    /// Sender for the outbound queue.
    ///
    /// Without a registry, the link stops once every sender is dropped and
    /// the queue has been drained.
    pub fn sender(&self) -> mpsc::Sender<Task> {
        self.tx.clone()
    }

    /// Shared view of the link state
    pub fn state_handle(&self) -> Arc<RwLock<ConnectionState>> {
        Arc::clone(&self.state)
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Drive the link until its queue closes
    pub async fn run(self) {
        let OutboundLink {
            spec,
            connector,
            config,
            state,
            tx,
            mut rx,
            registry,
            events,
        } = self;

        // Registered handles need a sender to hand out; otherwise only
        // outside senders keep the queue open
        let handle_tx = match registry {
            Some(_) => Some(tx),
            None => {
                drop(tx);
                None
            }
        };

        loop {
            *state.write() = ConnectionState::Dialing;
            let DialOutcome { stream, attempts } = dial_with_retry(
                connector.as_ref(),
                &spec.name,
                &spec.addr,
                config.reconnect_interval,
            )
            .await;

            let connection_id = next_connection_id();
            *state.write() = ConnectionState::Connected;
            info!(
                peer = %spec.name,
                addr = %spec.addr,
                connection_id,
                attempts,
                "Connected"
            );

            if let (Some(registry), Some(tx)) = (&registry, &handle_tx) {
                let handle = WorkerHandle::new(
                    spec.name.clone(),
                    spec.addr.clone(),
                    connection_id,
                    tx.clone(),
                    Arc::clone(&state),
                );
                if let Err(e) = registry.register(handle).await {
                    warn!(peer = %spec.name, error = %e, "Failed to register worker");
                }
            }

            emit(
                &events,
                ConnectionEvent::Connected {
                    peer: spec.name.clone(),
                    addr: spec.addr.clone(),
                    connection_id,
                    direction: Direction::Outbound,
                    attempts,
                },
            );

            let (returned, exit) =
                write_loop(spec.name.clone(), connection_id, stream, config.codec, rx).await;
            rx = returned;

            if let Some(registry) = &registry {
                if let Err(e) = registry.unregister(&spec.name, connection_id).await {
                    warn!(peer = %spec.name, error = %e, "Failed to unregister worker");
                }
            }

            if !matches!(exit, WriterExit::QueueClosed) {
                let discarded = discard_pending(&mut rx);
                if discarded > 0 {
                    warn!(
                        peer = %spec.name,
                        connection_id,
                        discarded,
                        "Dropped tasks queued for a broken connection"
                    );
                }
            }

            let reason = CloseReason::from(&exit);
            emit(
                &events,
                ConnectionEvent::Closed {
                    peer: spec.name.clone(),
                    connection_id,
                    direction: Direction::Outbound,
                    reason: reason.clone(),
                },
            );

            match exit {
                WriterExit::QueueClosed => {
                    info!(peer = %spec.name, connection_id, "Outbound queue closed, link stopped");
                    return;
                }
                WriterExit::PeerClosed | WriterExit::Failed(_) => {
                    *state.write() = ConnectionState::Failed;
                    warn!(
                        peer = %spec.name,
                        connection_id,
                        reason = %reason,
                        "Connection lost, redialing"
                    );
                }
            }
        }
    }
}

/// Empty the queue without blocking, returning how many tasks were dropped
fn discard_pending(rx: &mut mpsc::Receiver<Task>) -> usize {
    let mut discarded = 0;
    while rx.try_recv().is_ok() {
        discarded += 1;
    }
    discarded
}

fn emit(events: &Option<broadcast::Sender<ConnectionEvent>>, event: ConnectionEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
