//! Passive side: accept loop and per-connection reader loops

use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, error, info, trace, warn};

use super::{next_connection_id, CloseReason, ConnectionEvent, Direction, Inbound};
use crate::error::{Error, Result};
use crate::protocol::FrameCodec;

/// A bound TCP listener
pub struct Listener {
    inner: TcpListener,
    local_addr: SocketAddr,
}

impl Listener {
    /// Bind to `addr`. Failure here is fatal for the process.
    pub async fn bind(addr: &str) -> Result<Self> {
        let inner = TcpListener::bind(addr).await.map_err(|source| Error::Bind {
            addr: addr.to_string(),
            source,
        })?;
        let local_addr = inner.local_addr()?;
        info!(addr = %local_addr, "Listening");
        Ok(Self { inner, local_addr })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections forever, spawning one reader loop per connection.
    ///
    /// Every message read is pushed to `inbound`. Returns once `inbound` has
    /// no receiver left.
    pub async fn serve(
        self,
        codec: FrameCodec,
        inbound: mpsc::Sender<Inbound>,
        events: Option<broadcast::Sender<ConnectionEvent>>,
    ) {
        loop {
            if inbound.is_closed() {
                info!(addr = %self.local_addr, "Inbound queue closed, listener stopping");
                return;
            }

            let (stream, peer_addr) = match self.inner.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    error!(addr = %self.local_addr, error = %e, "Accept failed");
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    continue;
                }
            };

            if let Err(e) = stream.set_nodelay(true) {
                debug!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
            }

            let connection_id = next_connection_id();
            info!(peer = %peer_addr, connection_id, "Accepted connection");
            emit(
                &events,
                ConnectionEvent::Connected {
                    peer: peer_addr.to_string(),
                    addr: self.local_addr.to_string(),
                    connection_id,
                    direction: Direction::Inbound,
                    attempts: 1,
                },
            );

            let inbound = inbound.clone();
            let events = events.clone();
            tokio::spawn(async move {
                let reason = read_loop(peer_addr, connection_id, stream, codec, inbound).await;
                emit(
                    &events,
                    ConnectionEvent::Closed {
                        peer: peer_addr.to_string(),
                        connection_id,
                        direction: Direction::Inbound,
                        reason,
                    },
                );
            });
        }
    }
}

/// Read messages off one connection until it closes or fails.
///
/// The stream is dropped (and the socket closed) when this returns.
pub async fn read_loop<R>(
    peer_addr: SocketAddr,
    connection_id: u64,
    mut reader: R,
    codec: FrameCodec,
    inbound: mpsc::Sender<Inbound>,
) -> CloseReason
where
    R: AsyncRead + Unpin,
{
    let reason = loop {
        match codec.read_frame(&mut reader).await {
            Ok(Some(payload)) => {
                trace!(peer = %peer_addr, connection_id, bytes = payload.len(), "Read message");
                let msg = Inbound {
                    peer_addr,
                    connection_id,
                    payload,
                };
                if inbound.send(msg).await.is_err() {
                    break CloseReason::QueueClosed;
                }
            }
            Ok(None) => break CloseReason::PeerClosed,
            Err(e) => {
                warn!(
                    peer = %peer_addr,
                    connection_id,
                    error = %e.format_for_log(),
                    "Read failed, closing connection"
                );
                break CloseReason::Failed(e.to_string());
            }
        }
    };

    info!(peer = %peer_addr, connection_id, reason = %reason, "Connection closed");
    reason
}

fn emit(events: &Option<broadcast::Sender<ConnectionEvent>>, event: ConnectionEvent) {
    if let Some(tx) = events {
        let _ = tx.send(event);
    }
}
