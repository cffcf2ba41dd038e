//! Coordinator node
//!
//! Wires the pieces together:
//! - one outbound link per configured worker, registering it while connected
//! - the dispatcher draining the ingress queue into the registry's picks
//! - the optional built-in task source feeding the ingress queue
//! - the listener and sink for results relayed back by workers

mod sink;

pub use sink::*;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::config::{dial_address, listen_address, FabricConfig};
use crate::connection::{
    ConnectionEvent, Connector, Inbound, LinkConfig, Listener, OutboundLink, TcpConnector,
};
use crate::dispatcher::Dispatcher;
use crate::error::Result;
use crate::protocol::FrameCodec;
use crate::registry::RegistryHandle;
use crate::task_source::TaskSource;
use crate::types::{ConnectionState, Task, WorkerSpec};

const EVENT_BUFFER: usize = 256;

/// A coordinator with its result listener bound but nothing running yet
pub struct Coordinator<C: Connector = TcpConnector> {
    listener: Listener,
    registry: Option<RegistryHandle>,
    connector: Arc<C>,
    codec: FrameCodec,
    link_config: LinkConfig,
    queue_capacity: usize,
    task_source: Option<TaskSource>,
}

impl Coordinator<TcpConnector> {
    /// Bind the result listener from `[coordinator]` settings
    pub async fn bind(config: &FabricConfig) -> Result<Self> {
        let listener = Listener::bind(&listen_address(&config.coordinator.listen_addr)).await?;

        let task_source = if config.task_source.enabled {
            Some(TaskSource::new(config.task_source.interval(), &config.task_source.vocabulary)?)
        } else {
            None
        };

        Ok(Self {
            listener,
            registry: None,
            connector: Arc::new(TcpConnector),
            codec: config.connection.codec(),
            link_config: config.connection.link_config(),
            queue_capacity: config.connection.queue_capacity,
            task_source,
        })
    }
}

impl<C: Connector> Coordinator<C> {
    /// Use an existing registry instead of spawning one on start
    pub fn with_registry(mut self, registry: RegistryHandle) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Dial workers through `connector` instead of plain TCP
    pub fn with_connector<D: Connector>(self, connector: Arc<D>) -> Coordinator<D> {
        Coordinator {
            listener: self.listener,
            registry: self.registry,
            connector,
            codec: self.codec,
            link_config: self.link_config,
            queue_capacity: self.queue_capacity,
            task_source: self.task_source,
        }
    }

    pub fn with_task_source(mut self, source: Option<TaskSource>) -> Self {
        self.task_source = source;
        self
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.listener.local_addr()
    }

    /// Start linking to `workers` and dispatching.
    ///
    /// Must be called inside a tokio runtime.
    pub fn start(self, workers: Vec<WorkerSpec>) -> CoordinatorRuntime {
        let local_addr = self.listener.local_addr();
        let registry = self.registry.unwrap_or_else(RegistryHandle::spawn);
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        let (results_tap, _) = broadcast::channel(EVENT_BUFFER);
        let (ingress_tx, ingress_rx) = mpsc::channel(self.queue_capacity.max(1));
        let (results_tx, results_rx) = mpsc::channel(self.queue_capacity.max(1));
        let mut tasks = Vec::new();

        if workers.is_empty() {
            warn!("No workers configured, tasks will wait until one registers");
        }

        let mut links = BTreeMap::new();
        for spec in workers {
            let spec = WorkerSpec::new(spec.name, dial_address(&spec.addr));
            info!(worker = %spec.name, addr = %spec.addr, "Linking worker");
            let link = OutboundLink::new(spec, Arc::clone(&self.connector), self.link_config)
                .with_registry(registry.clone())
                .with_events(events.clone());
            links.insert(link.name().to_string(), link.state_handle());
            tasks.push(tokio::spawn(link.run()));
        }

        tasks.push(tokio::spawn(
            self.listener.serve(self.codec, results_tx, Some(events.clone())),
        ));

        let tap = results_tap.clone();
        tasks.push(tokio::spawn(async move {
            run_result_sink(results_rx, tap).await;
        }));

        let dispatcher = Dispatcher::new(registry.clone());
        tasks.push(tokio::spawn(async move {
            dispatcher.run(ingress_rx).await;
        }));

        if let Some(source) = self.task_source {
            let ingress = ingress_tx.clone();
            tasks.push(tokio::spawn(async move {
                source.run(ingress).await;
            }));
        }

        info!(
            addr = %local_addr,
            workers = links.len(),
            framing = %self.codec.framing,
            "Coordinator started"
        );

        CoordinatorRuntime {
            local_addr,
            ingress: ingress_tx,
            registry,
            events,
            results: results_tap,
            links,
            tasks,
        }
    }
}

/// Handles to a running coordinator
pub struct CoordinatorRuntime {
    local_addr: SocketAddr,
    ingress: mpsc::Sender<Task>,
    registry: RegistryHandle,
    events: broadcast::Sender<ConnectionEvent>,
    results: broadcast::Sender<Inbound>,
    links: BTreeMap<String, Arc<RwLock<ConnectionState>>>,
    tasks: Vec<JoinHandle<()>>,
}

impl CoordinatorRuntime {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Sender for pushing tasks from an external producer
    pub fn ingress(&self) -> mpsc::Sender<Task> {
        self.ingress.clone()
    }

    pub fn registry(&self) -> RegistryHandle {
        self.registry.clone()
    }

    /// Connection lifecycle events from every link and the result listener
    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }

    /// Results relayed back by workers
    pub fn subscribe_results(&self) -> broadcast::Receiver<Inbound> {
        self.results.subscribe()
    }

    /// Current state of every worker link
    pub fn link_states(&self) -> BTreeMap<String, ConnectionState> {
        self.links
            .iter()
            .map(|(name, state)| (name.clone(), *state.read()))
            .collect()
    }

    /// Stop every loop and close all sockets
    pub fn shutdown(self) {
        for task in &self.tasks {
            task.abort();
        }
        info!(addr = %self.local_addr, "Coordinator stopped");
    }
}
