//! Length-prefixed message framing
//!
//! - [`FramedReader`] reassembles messages from a blocking byte source
//! - [`MessageSink`] prints them as `HEX:LEN` lines

pub mod message;
pub mod reader;
pub mod sink;

pub use message::Message;
pub use reader::{FramedReader, ReaderConfig, SentinelMode};
pub use sink::MessageSink;
