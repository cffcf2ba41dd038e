//! Worker-side payload transforms

use bytes::Bytes;

/// A pure function applied to every payload a worker receives
pub trait Transform: Send + Sync {
    fn name(&self) -> &'static str;

    fn apply(&self, input: &[u8]) -> Bytes;
}

/// Uppercases text payloads.
///
/// Valid UTF-8 goes through full Unicode case mapping. Anything else is
/// uppercased byte-wise over ASCII only, leaving other bytes untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Uppercase;

impl Transform for Uppercase {
    fn name(&self) -> &'static str {
        "uppercase"
    }

    fn apply(&self, input: &[u8]) -> Bytes {
        match std::str::from_utf8(input) {
            Ok(text) => Bytes::from(text.to_uppercase()),
            Err(_) => Bytes::from(input.to_ascii_uppercase()),
        }
    }
}
