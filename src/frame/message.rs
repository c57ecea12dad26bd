//! A single reassembled message

use std::fmt;

/// A complete length-prefixed message as received from the wire.
///
/// The first byte holds `len - 1`. Because the reader appends whole chunks,
/// `len()` may exceed the declared length when a sender runs messages
/// together within one read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    bytes: Vec<u8>,
}

impl Message {
    pub(crate) fn new(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Length announced by the prefix byte
    pub fn declared_len(&self) -> usize {
        self.bytes.first().map_or(0, |&b| b as usize + 1)
    }

    /// Uppercase hex, two digits per byte, no separator
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.as_bytes())
    }
}

/// Formats as `HEX:LEN`, the line printed for each message
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.to_hex(), self.len())
    }
}
