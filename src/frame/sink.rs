//! Output side: one `HEX:LEN` line per message

use crate::frame::Message;
use anyhow::{Context, Result};
use chrono::Local;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Writes completed messages to the diagnostic stream, and optionally to a
/// log file. Both are flushed after every message.
pub struct MessageSink<W: Write> {
    out: W,
    show_timestamps: bool,
    log_writer: Option<BufWriter<File>>,
}

impl<W: Write> MessageSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            show_timestamps: false,
            log_writer: None,
        }
    }

    /// Prefix each line with the local wall-clock time
    pub fn with_timestamps(mut self, enabled: bool) -> Self {
        self.show_timestamps = enabled;
        self
    }

    /// Also append every message to `path`, truncating it first
    pub fn with_log_file(mut self, path: &Path) -> Result<Self> {
        let file = File::create(path)
            .with_context(|| format!("Failed to create log file: {}", path.display()))?;
        self.log_writer = Some(BufWriter::new(file));
        Ok(self)
    }

    pub fn emit(&mut self, message: &Message) -> Result<()> {
        if self.show_timestamps {
            write!(self.out, "{} ", Local::now().format("%H:%M:%S%.3f"))?;
        }
        writeln!(self.out, "{}", message)?;
        self.out.flush().context("Failed to flush message output")?;

        if let Some(ref mut writer) = self.log_writer {
            let timestamp = Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
            writeln!(writer, "[{}] {}", timestamp, message)?;
            writer.flush()?;
        }

        Ok(())
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_plain_line_format() {
        let mut sink = MessageSink::new(Vec::new());
        sink.emit(&Message::new(vec![0x02, 0xAA, 0xBB])).unwrap();
        sink.emit(&Message::new(vec![0x00])).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(out, "02AABB:3\n00:1\n");
    }

    #[test]
    fn test_timestamp_prefix() {
        let mut sink = MessageSink::new(Vec::new()).with_timestamps(true);
        sink.emit(&Message::new(vec![0x00])).unwrap();

        let out = String::from_utf8(sink.into_inner()).unwrap();
        let (stamp, line) = out.trim_end().split_once(' ').unwrap();
        assert_eq!(stamp.len(), "00:00:00.000".len());
        assert_eq!(line, "00:1");
    }

    #[test]
    fn test_log_file_receives_messages() {
        let dir = tempdir().unwrap();
        let log_path = dir.path().join("frames.log");

        let mut sink = MessageSink::new(Vec::new()).with_log_file(&log_path).unwrap();
        sink.emit(&Message::new(vec![0x01, 0xFE])).unwrap();

        let logged = std::fs::read_to_string(&log_path).unwrap();
        assert!(logged.starts_with('['));
        assert!(logged.trim_end().ends_with("] 01FE:2"));
    }
}
