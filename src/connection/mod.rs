//! Connection management
//!
//! One TCP connection per peer, each bound 1:1 to dedicated loops:
//! - [`dial`]: active connect with fixed-interval retry
//! - [`listener`]: passive accept, one reader loop per connection
//! - [`writer`]: outbound queue drained onto a socket
//! - [`link`]: supervisor tying dial, writer and registry membership together
//!
//! Every broken connection is closed and reported as a [`ConnectionEvent`];
//! no loop keeps running on a socket known to be dead.

pub mod dial;
pub mod link;
pub mod listener;
pub mod writer;

pub use dial::*;
pub use link::*;
pub use listener::*;
pub use writer::*;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use bytes::Bytes;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Allocate a process-unique connection id
pub fn next_connection_id() -> u64 {
    NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed)
}

/// Which side opened the connection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// We dialed out
    Outbound,
    /// We accepted
    Inbound,
}

/// Lifecycle events published by connection loops
#[derive(Debug, Clone)]
pub enum ConnectionEvent {
    /// A connection was established
    Connected {
        peer: String,
        addr: String,
        connection_id: u64,
        direction: Direction,
        /// Dial attempts it took (1 for accepted connections)
        attempts: u32,
    },

    /// A connection was closed and its loops terminated
    Closed {
        peer: String,
        connection_id: u64,
        direction: Direction,
        reason: CloseReason,
    },
}

/// Why a connection ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// Peer closed the stream cleanly
    PeerClosed,
    /// Read or write failed; the socket was dropped
    Failed(String),
    /// The local queue feeding or draining this connection was closed
    QueueClosed,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::PeerClosed => f.write_str("peer closed"),
            CloseReason::Failed(e) => write!(f, "failed: {}", e),
            CloseReason::QueueClosed => f.write_str("queue closed"),
        }
    }
}

/// One message read off an accepted connection
#[derive(Debug, Clone)]
pub struct Inbound {
    pub peer_addr: SocketAddr,
    pub connection_id: u64,
    pub payload: Bytes,
}
