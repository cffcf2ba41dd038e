//! Writer loop: drains an outbound queue onto one socket

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use super::CloseReason;
use crate::error::Error;
use crate::protocol::FrameCodec;
use crate::types::Task;

/// Why a writer loop returned
#[derive(Debug)]
pub enum WriterExit {
    /// Every sender of the outbound queue is gone
    QueueClosed,
    /// Peer closed its end of the socket
    PeerClosed,
    /// A write or read on the socket failed
    Failed(Error),
}

impl From<&WriterExit> for CloseReason {
    fn from(exit: &WriterExit) -> Self {
        match exit {
            WriterExit::QueueClosed => CloseReason::QueueClosed,
            WriterExit::PeerClosed => CloseReason::PeerClosed,
            WriterExit::Failed(e) => CloseReason::Failed(e.to_string()),
        }
    }
}

/// Write every queued task to `stream` until the queue closes or the socket
/// breaks.
///
/// The read half is watched at the same time so a peer that hangs up is
/// noticed while the queue is idle, not only on the next write. The socket
/// is closed on return and the queue receiver is handed back so the caller
/// can reuse it for the next connection.
pub async fn write_loop<S>(
    peer: String,
    connection_id: u64,
    stream: S,
    codec: FrameCodec,
    mut outbound: mpsc::Receiver<Task>,
) -> (mpsc::Receiver<Task>, WriterExit)
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let mut probe = [0u8; 256];

    debug!(peer = %peer, connection_id, "Writer loop started");

    let exit = loop {
        tokio::select! {
            msg = outbound.recv() => match msg {
                Some(task) => {
                    if let Err(e) = codec.write_frame(&mut writer, task.as_bytes()).await {
                        warn!(
                            peer = %peer,
                            connection_id,
                            bytes = task.len(),
                            error = %e.format_for_log(),
                            "Write failed, task lost"
                        );
                        break WriterExit::Failed(e);
                    }
                    trace!(peer = %peer, connection_id, bytes = task.len(), "Wrote task");
                }
                None => break WriterExit::QueueClosed,
            },
            read = reader.read(&mut probe) => match read {
                Ok(0) => break WriterExit::PeerClosed,
                Ok(n) => {
                    debug!(
                        peer = %peer,
                        connection_id,
                        bytes = n,
                        "Discarding bytes received on outbound link"
                    );
                }
                Err(e) => break WriterExit::Failed(Error::connection_lost(&peer, e.to_string())),
            },
        }
    };

    let _ = writer.shutdown().await;
    debug!(peer = %peer, connection_id, reason = %CloseReason::from(&exit), "Writer loop stopped");

    (outbound, exit)
}
