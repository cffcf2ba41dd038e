//! Active dialing with fixed-interval retry
//!
//! A dial loop never gives up: each failure is logged and followed by the
//! same fixed wait before the next attempt.

use std::time::Duration;

use async_trait::async_trait;
use backoff::backoff::{Backoff, Constant};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tracing::{debug, warn};

use crate::error::Error;

/// Default wait between failed connection attempts
pub const DEFAULT_RECONNECT_INTERVAL: Duration = Duration::from_secs(3);

/// Opens byte streams to an address
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    type Stream: AsyncRead + AsyncWrite + Send + Unpin + 'static;

    async fn connect(&self, addr: &str) -> std::io::Result<Self::Stream>;
}

/// Plain TCP connector
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

#[async_trait]
impl Connector for TcpConnector {
    type Stream = TcpStream;

    async fn connect(&self, addr: &str) -> std::io::Result<TcpStream> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;
        Ok(stream)
    }
}

/// A successfully dialed stream
#[derive(Debug)]
pub struct DialOutcome<S> {
    pub stream: S,
    /// Total connect calls, including the successful one
    pub attempts: u32,
}

/// Dial `addr` until it succeeds, waiting `interval` after every failure
pub async fn dial_with_retry<C: Connector>(
    connector: &C,
    peer: &str,
    addr: &str,
    interval: Duration,
) -> DialOutcome<C::Stream> {
    let mut policy = Constant::new(interval);
    let mut attempts: u32 = 0;

    loop {
        attempts = attempts.saturating_add(1);
        debug!(peer = %peer, addr = %addr, attempt = attempts, "Dialing");

        match connector.connect(addr).await {
            Ok(stream) => {
                return DialOutcome { stream, attempts };
            }
            Err(e) => {
                let err = Error::connection_failed(addr, e.to_string());
                let delay = policy.next_backoff().unwrap_or(interval);
                warn!(
                    peer = %peer,
                    addr = %addr,
                    attempt = attempts,
                    error = %err.format_for_log(),
                    retryable = err.is_retryable(),
                    retry_in_ms = delay.as_millis() as u64,
                    "Connect failed, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
