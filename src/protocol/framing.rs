//! Message framing over TCP
//!
//! Two modes are supported:
//!
//! - `LengthPrefixed` (default): `[4-byte big-endian length][payload]`.
//!   Frames above `max_frame_size` close the connection.
//! - `Raw`: each socket read of up to `read_buffer_size` bytes is one
//!   message. Payloads larger than the buffer are split and several small
//!   writes may arrive merged into one read. Kept for compatibility with
//!   unframed peers.

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};

/// Default size of the read buffer in raw mode
pub const DEFAULT_READ_BUFFER_SIZE: usize = 1024;

/// Default upper bound for a length-prefixed frame (1 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: u32 = 1024 * 1024;

const HEADER_LEN: usize = 4;

/// How messages are delimited on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Framing {
    #[default]
    LengthPrefixed,
    Raw,
}

impl FromStr for Framing {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "length-prefixed" | "length_prefixed" | "framed" => Ok(Framing::LengthPrefixed),
            "raw" => Ok(Framing::Raw),
            other => Err(Error::config_field_invalid(
                "connection.framing",
                format!("Unknown framing '{}'. Must be one of: length-prefixed, raw", other),
            )),
        }
    }
}

impl fmt::Display for Framing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Framing::LengthPrefixed => f.write_str("length-prefixed"),
            Framing::Raw => f.write_str("raw"),
        }
    }
}

/// Reads and writes messages according to a [`Framing`] mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameCodec {
    pub framing: Framing,
    pub read_buffer_size: usize,
    pub max_frame_size: u32,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self {
            framing: Framing::LengthPrefixed,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }
}

impl FrameCodec {
    pub fn raw(read_buffer_size: usize) -> Self {
        Self {
            framing: Framing::Raw,
            read_buffer_size,
            ..Self::default()
        }
    }

    /// Read the next message.
    ///
    /// Returns `Ok(None)` when the peer closed the stream cleanly, i.e. at a
    /// frame boundary in length-prefixed mode or on a zero-length read in raw
    /// mode.
    pub async fn read_frame<R>(&self, reader: &mut R) -> Result<Option<Bytes>>
    where
        R: AsyncRead + Unpin,
    {
        match self.framing {
            Framing::LengthPrefixed => self.read_length_prefixed(reader).await,
            Framing::Raw => self.read_raw(reader).await,
        }
    }

    /// Write one message and flush
    pub async fn write_frame<W>(&self, writer: &mut W, payload: &[u8]) -> Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        if self.framing == Framing::LengthPrefixed {
            let len = u32::try_from(payload.len())
                .ok()
                .filter(|len| *len <= self.max_frame_size)
                .ok_or(Error::FrameTooLarge {
                    size: payload.len().min(u32::MAX as usize) as u32,
                    max: self.max_frame_size,
                })?;
            writer.write_u32(len).await?;
        }

        writer.write_all(payload).await?;
        writer.flush().await?;
        Ok(())
    }

    async fn read_length_prefixed<R>(&self, reader: &mut R) -> Result<Option<Bytes>>
    where
        R: AsyncRead + Unpin,
    {
        let mut header = [0u8; HEADER_LEN];
        let mut filled = 0;
        while filled < HEADER_LEN {
            let n = reader.read(&mut header[filled..]).await?;
            if n == 0 {
                if filled == 0 {
                    return Ok(None);
                }
                return Err(Error::ProtocolMalformed {
                    message: format!(
                        "stream ended after {} of {} header bytes",
                        filled, HEADER_LEN
                    ),
                });
            }
            filled += n;
        }

        let len = u32::from_be_bytes(header);
        if len > self.max_frame_size {
            return Err(Error::FrameTooLarge {
                size: len,
                max: self.max_frame_size,
            });
        }

        let mut payload = vec![0u8; len as usize];
        reader.read_exact(&mut payload).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::UnexpectedEof {
                Error::ProtocolMalformed {
                    message: format!("stream ended inside a {} byte frame", len),
                }
            } else {
                Error::Io(e)
            }
        })?;

        Ok(Some(Bytes::from(payload)))
    }

    async fn read_raw<R>(&self, reader: &mut R) -> Result<Option<Bytes>>
    where
        R: AsyncRead + Unpin,
    {
        let mut buf = vec![0u8; self.read_buffer_size];
        let n = reader.read(&mut buf).await?;
        if n == 0 {
            return Ok(None);
        }
        buf.truncate(n);
        Ok(Some(Bytes::from(buf)))
    }
}
