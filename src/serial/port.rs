//! Serial port configuration and discovery
//!
//! The defaults describe the line settings expected by the framed devices:
//! 38400 baud, 8 data bits, no parity checking, RTS/CTS flow control, and a
//! blocking read that returns as soon as one byte is available.

use serde::{Deserialize, Serialize};

#[cfg(feature = "serial")]
use anyhow::{Context, Result};
#[cfg(feature = "serial")]
use colored::Colorize;

/// Baud rates accepted for a port session
pub const COMMON_BAUD_RATES: &[u32] = &[
    1200, 2400, 4800, 9600, 19200,
    38400,  // Default for framed devices
    57600, 115200, 230400,
];

pub const DEFAULT_PORT: &str = "/dev/ttyUSB0";
pub const DEFAULT_BAUD: u32 = 38400;

/// Flow control applied to the line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    None,
    /// RTS/CTS
    #[default]
    Hardware,
}

/// Configuration for a port session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortConfig {
    /// Serial port path (e.g., /dev/ttyUSB0, /dev/ttyACM0)
    pub port_path: String,
    pub baud_rate: u32,
    pub flow_control: FlowControl,
    /// Minimum bytes before a read returns (VMIN)
    pub min_read_bytes: u8,
    /// Inter-byte timeout in deciseconds, 0 disables it (VTIME)
    pub inter_byte_timeout: u8,
}

impl Default for PortConfig {
    fn default() -> Self {
        Self {
            port_path: String::from(DEFAULT_PORT),
            baud_rate: DEFAULT_BAUD,
            flow_control: FlowControl::Hardware,
            min_read_bytes: 1,
            inter_byte_timeout: 0,
        }
    }
}

impl PortConfig {
    pub fn new(port_path: &str) -> Self {
        Self {
            port_path: port_path.to_string(),
            ..Default::default()
        }
    }

    /// Set the baud rate
    pub fn with_baud_rate(mut self, baud_rate: u32) -> Self {
        self.baud_rate = baud_rate;
        self
    }

    pub fn with_flow_control(mut self, flow_control: FlowControl) -> Self {
        self.flow_control = flow_control;
        self
    }
}

pub fn is_supported_baud(baud_rate: u32) -> bool {
    COMMON_BAUD_RATES.contains(&baud_rate)
}

/// Information about a detected serial port
#[cfg(feature = "serial")]
#[derive(Debug, Clone)]
pub struct PortInfo {
    pub path: String,
    pub port_type: String,
    pub manufacturer: Option<String>,
    pub product: Option<String>,
    pub vid: Option<u16>,
    pub pid: Option<u16>,
}

/// List all available serial ports
#[cfg(feature = "serial")]
pub fn list_ports() -> Result<Vec<PortInfo>> {
    let ports = serialport::available_ports().with_context(|| "Failed to enumerate serial ports")?;

    Ok(ports
        .into_iter()
        .map(|p| match p.port_type {
            serialport::SerialPortType::UsbPort(info) => PortInfo {
                path: p.port_name,
                port_type: "USB Serial".to_string(),
                manufacturer: info.manufacturer,
                product: info.product,
                vid: Some(info.vid),
                pid: Some(info.pid),
            },
            other => PortInfo {
                path: p.port_name,
                port_type: match other {
                    serialport::SerialPortType::PciPort => "PCI Serial",
                    serialport::SerialPortType::BluetoothPort => "Bluetooth",
                    _ => "Unknown",
                }
                .to_string(),
                manufacturer: None,
                product: None,
                vid: None,
                pid: None,
            },
        })
        .collect())
}

/// Print formatted list of available serial ports
#[cfg(feature = "serial")]
pub fn print_ports() -> Result<()> {
    let ports = list_ports()?;

    if ports.is_empty() {
        println!("{}", "No serial ports found".yellow());
        println!(
            "Pass the device path directly with {} if it is not enumerated",
            "read -p <PORT>".cyan()
        );
        return Ok(());
    }

    println!("{} {} port(s)", "[*]".cyan().bold(), ports.len());
    for port in ports {
        let usb_id = match (port.vid, port.pid) {
            (Some(vid), Some(pid)) => format!(" [{:04x}:{:04x}]", vid, pid),
            _ => String::new(),
        };
        let label: Vec<&str> = [port.manufacturer.as_deref(), port.product.as_deref()]
            .into_iter()
            .flatten()
            .collect();
        println!(
            "  {} ({}){} {}",
            port.path.white().bold(),
            port.port_type,
            usb_id,
            label.join(" ").dimmed()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PortConfig::default();
        assert_eq!(config.baud_rate, 38400);
        assert_eq!(config.port_path, "/dev/ttyUSB0");
        assert_eq!(config.flow_control, FlowControl::Hardware);
        assert_eq!(config.min_read_bytes, 1);
        assert_eq!(config.inter_byte_timeout, 0);
    }

    #[test]
    fn test_config_builder() {
        let config = PortConfig::new("/dev/ttyACM0")
            .with_baud_rate(9600)
            .with_flow_control(FlowControl::None);

        assert_eq!(config.port_path, "/dev/ttyACM0");
        assert_eq!(config.baud_rate, 9600);
        assert_eq!(config.flow_control, FlowControl::None);
    }

    #[test]
    fn test_supported_baud_rates() {
        assert!(is_supported_baud(38400));
        assert!(is_supported_baud(115200));
        assert!(!is_supported_baud(12345));
    }
}
