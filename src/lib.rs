//! Task fabric
//!
//! A coordinator holds one TCP link per statically configured worker and
//! forwards every task to a worker chosen uniformly at random among those
//! currently connected. Workers uppercase what they receive and may relay the
//! result back to the coordinator.
//!
//! Delivery is best-effort: tasks queued to a worker whose connection breaks
//! are dropped when the break is noticed, and nothing is acknowledged or
//! retried.

pub mod cli;
pub mod config;
pub mod connection;
pub mod coordinator;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod registry;
pub mod task_source;
pub mod transform;
pub mod types;
pub mod version;
pub mod worker;

pub use config::{FabricConfig, Role};
pub use coordinator::{Coordinator, CoordinatorRuntime};
pub use error::{Error, ErrorCode, Result};
pub use registry::{RegistryHandle, WorkerHandle, WorkerRegistry};
pub use types::{ConnectionState, Task, WorkerSpec};
pub use worker::{WorkerNode, WorkerRuntime};
