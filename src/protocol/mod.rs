//! Wire protocol between coordinator and workers
//!
//! The fabric carries raw task payloads; the only protocol concern is how
//! byte-stream boundaries map to messages. See [`framing`].

mod framing;

pub use framing::*;
