//! Framed message monitor
//!
//! Drives a [`FramedReader`] into a [`MessageSink`] until the reader reports
//! end-of-stream, either a live device session or a replayed capture file.

use crate::frame::{FramedReader, MessageSink, ReaderConfig};
use anyhow::{Context, Result};
use colored::Colorize;
use log::debug;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

#[cfg(unix)]
use crate::serial::{PortConfig, PortSession};

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The sentinel message was received
    Sentinel,
    /// The source closed on a message boundary
    EndOfStream,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub messages: usize,
    pub bytes: usize,
    pub end: SessionEnd,
}

/// Pumps messages from a reader to a sink
pub struct SerialMonitor<R, W: Write> {
    reader: FramedReader<R>,
    sink: MessageSink<W>,
    message_count: usize,
    byte_count: usize,
}

impl<R: Read, W: Write> SerialMonitor<R, W> {
    pub fn new(reader: FramedReader<R>, sink: MessageSink<W>) -> Self {
        Self {
            reader,
            sink,
            message_count: 0,
            byte_count: 0,
        }
    }

    /// Read and emit messages until the stream ends
    pub fn run(&mut self) -> Result<SessionSummary> {
        while let Some(message) = self
            .reader
            .next_message()
            .with_context(|| format!("Failed to read message {}", self.message_count + 1))?
        {
            self.message_count += 1;
            self.byte_count += message.len();
            debug!(
                "Message {}: {} bytes (declared {})",
                self.message_count,
                message.len(),
                message.declared_len()
            );
            self.sink.emit(&message)?;
        }

        Ok(SessionSummary {
            messages: self.message_count,
            bytes: self.byte_count,
            end: if self.reader.sentinel_seen() {
                SessionEnd::Sentinel
            } else {
                SessionEnd::EndOfStream
            },
        })
    }

    #[cfg(test)]
    pub fn into_sink(self) -> MessageSink<W> {
        self.sink
    }
}

/// Read from a serial device until the sentinel message arrives.
///
/// The device's previous terminal settings are restored after the final
/// message, and also when reading fails.
#[cfg(unix)]
pub fn run_device<W: Write>(
    port_config: &PortConfig,
    reader_config: ReaderConfig,
    sink: MessageSink<W>,
) -> Result<SessionSummary> {
    let mut session = PortSession::open(port_config)?;

    println!(
        "{} Connected to {} at {} baud",
        "[OK]".green().bold(),
        port_config.port_path.white().bold(),
        port_config.baud_rate
    );

    let result = SerialMonitor::new(FramedReader::new(&mut session, reader_config), sink).run();
    let restored = session
        .restore()
        .with_context(|| format!("Failed to restore settings on {}", port_config.port_path));

    let summary = result?;
    restored?;
    Ok(summary)
}

/// Run the reader over a file of captured raw bytes
pub fn run_replay<W: Write>(
    path: &Path,
    reader_config: ReaderConfig,
    sink: MessageSink<W>,
) -> Result<SessionSummary> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open capture file: {}", path.display()))?;

    println!("{} Replaying {}", "[*]".cyan().bold(), path.display());

    SerialMonitor::new(FramedReader::new(file, reader_config), sink).run()
}

/// Print summary statistics
pub fn print_summary(summary: &SessionSummary) {
    println!("\n{}", "=".repeat(60).dimmed());
    println!("{}", "--- Session Summary ---".cyan().bold());
    println!("Messages received: {}", summary.messages);
    println!("Bytes received: {}", summary.bytes);
    println!(
        "Ended by: {}",
        match summary.end {
            SessionEnd::Sentinel => "sentinel message".green().to_string(),
            SessionEnd::EndOfStream => "end of stream".yellow().to_string(),
        }
    );
    println!("{}", "=".repeat(60).dimmed());
}
