//! Configuration file support
//!
//! An optional TOML file supplies defaults that command-line flags override.
//! Every key is optional:
//!
//! ```toml
//! [port]
//! path = "/dev/ttyUSB0"
//! baud_rate = 38400
//! flow_control = "hardware"   # or "none"
//!
//! [framing]
//! chunk_size = 32
//! max_message_len = 512
//! sentinel = 122              # 'z'
//! sentinel_mode = "chunk-leading"
//!
//! [output]
//! timestamps = false
//! log_file = "frames.log"
//! ```

use crate::error::ConfigError;
use crate::frame::reader::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_MESSAGE_LEN, DEFAULT_SENTINEL, MAX_FRAME_LEN,
};
use crate::frame::{ReaderConfig, SentinelMode};
use crate::serial::port::{is_supported_baud, FlowControl, PortConfig, DEFAULT_BAUD, DEFAULT_PORT};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Largest read request accepted for `chunk_size`
pub const MAX_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub port: PortSection,
    pub framing: FramingSection,
    pub output: OutputSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PortSection {
    pub path: String,
    pub baud_rate: u32,
    pub flow_control: FlowControl,
}

impl Default for PortSection {
    fn default() -> Self {
        Self {
            path: DEFAULT_PORT.to_string(),
            baud_rate: DEFAULT_BAUD,
            flow_control: FlowControl::Hardware,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FramingSection {
    pub chunk_size: usize,
    pub max_message_len: usize,
    pub sentinel: u8,
    pub sentinel_mode: SentinelMode,
}

impl Default for FramingSection {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_message_len: DEFAULT_MAX_MESSAGE_LEN,
            sentinel: DEFAULT_SENTINEL,
            sentinel_mode: SentinelMode::ChunkLeading,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputSection {
    pub timestamps: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
}

impl AppConfig {
    /// Load and validate a config file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.port.path.is_empty() {
            return Err(ConfigError::Invalid("port path is empty".into()));
        }
        if !is_supported_baud(self.port.baud_rate) {
            return Err(ConfigError::Invalid(format!(
                "unsupported baud rate {}",
                self.port.baud_rate
            )));
        }

        let framing = &self.framing;
        if framing.chunk_size == 0 || framing.chunk_size > MAX_CHUNK_SIZE {
            return Err(ConfigError::Invalid(format!(
                "chunk_size must be between 1 and {}, got {}",
                MAX_CHUNK_SIZE, framing.chunk_size
            )));
        }
        // a full frame can arrive as 255 buffered bytes plus one whole chunk
        let required = MAX_FRAME_LEN - 1 + framing.chunk_size;
        if framing.max_message_len < required {
            return Err(ConfigError::Invalid(format!(
                "max_message_len ({}) must be at least {} for chunk_size {}",
                framing.max_message_len, required, framing.chunk_size
            )));
        }

        Ok(())
    }

    pub fn port_config(&self) -> PortConfig {
        PortConfig::new(&self.port.path)
            .with_baud_rate(self.port.baud_rate)
            .with_flow_control(self.port.flow_control)
    }

    pub fn reader_config(&self) -> ReaderConfig {
        ReaderConfig {
            chunk_size: self.framing.chunk_size,
            max_message_len: self.framing.max_message_len,
            sentinel: self.framing.sentinel,
            sentinel_mode: self.framing.sentinel_mode,
        }
    }

    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
