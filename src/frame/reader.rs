//! Framed byte reader
//!
//! Reassembles length-prefixed messages from a blocking byte source that
//! returns between one and `chunk_size` bytes per read. The first byte of
//! every message holds `len - 1`, so the target length is only known once
//! that byte has arrived.
//!
//! Reading stops after the message in which the sentinel byte was observed.
//! By default the sentinel is compared against the first byte of every raw
//! chunk read for the current message, which matches the behaviour of the
//! devices this tool was written against.

use crate::error::FrameError;
use crate::frame::Message;
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use std::io::{ErrorKind, Read};
use std::time::Duration;

/// Bytes requested per read call
pub const DEFAULT_CHUNK_SIZE: usize = 32;

/// Longest frame a one-byte length prefix can announce
pub const MAX_FRAME_LEN: usize = 256;

/// Upper bound on a reassembled message (256 byte frame plus chunk overrun)
pub const DEFAULT_MAX_MESSAGE_LEN: usize = 512;

/// ASCII `'z'`
pub const DEFAULT_SENTINEL: u8 = b'z';

/// Which bytes are compared against the sentinel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum SentinelMode {
    /// First byte of each raw chunk belonging to the current message
    #[default]
    ChunkLeading,
    /// Only the first byte of the message itself
    MessageLeading,
}

/// Reader tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderConfig {
    pub chunk_size: usize,
    pub max_message_len: usize,
    pub sentinel: u8,
    pub sentinel_mode: SentinelMode,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            sentinel: DEFAULT_SENTINEL,
            sentinel_mode: SentinelMode::default(),
        }
    }
}

/// Pulls complete messages out of a byte source
pub struct FramedReader<R> {
    source: R,
    config: ReaderConfig,
    chunk: Vec<u8>,
    sentinel_seen: bool,
    stopped: bool,
}

impl<R: Read> FramedReader<R> {
    pub fn new(source: R, config: ReaderConfig) -> Self {
        let chunk = vec![0u8; config.chunk_size.max(1)];
        Self {
            source,
            config,
            chunk,
            sentinel_seen: false,
            stopped: false,
        }
    }

    /// Whether reading ended because the sentinel was observed
    pub fn sentinel_seen(&self) -> bool {
        self.sentinel_seen
    }

    #[cfg(test)]
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Read the next complete message.
    ///
    /// Returns `Ok(None)` once the sentinel message has been delivered or the
    /// source reports end-of-file on a message boundary. No reads are issued
    /// after that point. Any error also ends the stream.
    pub fn next_message(&mut self) -> Result<Option<Message>, FrameError> {
        if self.stopped {
            return Ok(None);
        }

        let result = self.read_message();
        match result {
            Ok(Some(_)) if self.sentinel_seen => self.stopped = true,
            Ok(None) | Err(_) => self.stopped = true,
            Ok(Some(_)) => {}
        }
        result
    }

    fn read_message(&mut self) -> Result<Option<Message>, FrameError> {
        let mut buf: Vec<u8> = Vec::new();
        let mut target: Option<usize> = None;

        loop {
            let n = self.read_chunk()?;
            if n == 0 {
                return match target {
                    None => {
                        debug!("Source closed on a message boundary");
                        Ok(None)
                    }
                    Some(expected) => Err(FrameError::Truncated {
                        expected,
                        received: buf.len(),
                    }),
                };
            }

            let chunk = &self.chunk[..n];
            let expected = *target.get_or_insert(chunk[0] as usize + 1);

            let checked = match self.config.sentinel_mode {
                SentinelMode::ChunkLeading => true,
                SentinelMode::MessageLeading => buf.is_empty(),
            };
            if checked && chunk[0] == self.config.sentinel {
                debug!("Sentinel 0x{:02X} observed, stopping after this message", chunk[0]);
                self.sentinel_seen = true;
            }

            let attempted = buf.len() + n;
            if attempted > self.config.max_message_len {
                return Err(FrameError::MessageTooLong {
                    capacity: self.config.max_message_len,
                    attempted,
                });
            }
            buf.extend_from_slice(chunk);
            trace!("Chunk of {} bytes, {}/{} accumulated", n, buf.len(), expected);

            if buf.len() >= expected {
                return Ok(Some(Message::new(buf)));
            }
        }
    }

    fn read_chunk(&mut self) -> Result<usize, FrameError> {
        loop {
            match self.source.read(&mut self.chunk) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock) => {
                    // No data yet, brief sleep
                    std::thread::sleep(Duration::from_millis(10));
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

impl<R: Read> Iterator for FramedReader<R> {
    type Item = Result<Message, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_message().transpose()
    }
}
