//! Serial Frame Dump
//!
//! Reads length-prefixed messages from a serial device configured for raw,
//! blocking input and prints each one as an uppercase hex line on stderr.
//!
//! # Wire format
//!
//! The first byte of every message holds the message length minus one, so a
//! message is between 1 and 256 bytes long. Reading stops after the message
//! in which the sentinel byte (`'z'`, 0x7A) was seen, and the device's
//! previous terminal settings are then restored.
//!
//! # Usage
//!
//! ```bash
//! # Read from the default device (/dev/ttyUSB0 at 38400 baud, RTS/CTS)
//! serial-frame-dump read
//!
//! # Read from another port, logging messages to a file as well
//! serial-frame-dump read -p /dev/ttyACM0 --log frames.log --timestamps
//!
//! # Frame a raw capture file exactly as a live session would
//! serial-frame-dump replay capture.bin --chunk-size 1
//!
//! # Show the effective configuration
//! serial-frame-dump -c frames.toml config
//!
//! # List available serial ports (requires serial feature)
//! serial-frame-dump ports
//! ```

mod config;
mod error;
mod frame;
mod serial;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use std::io::{self, Stderr};
use std::path::PathBuf;

use config::{AppConfig, OutputSection};
use frame::{MessageSink, SentinelMode};
use serial::monitor::{print_summary, run_replay};
use serial::FlowControl;

/// Serial Frame Dump
///
/// Length-prefixed message reader for raw serial devices
#[derive(Parser)]
#[command(name = "serial-frame-dump")]
#[command(version)]
#[command(about = "Reads length-prefixed messages from a serial device and dumps them as hex")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Read messages from a serial device until the sentinel arrives
    Read {
        /// Serial port path (e.g., /dev/ttyUSB0)
        #[arg(short, long)]
        port: Option<String>,

        /// Baud rate
        #[arg(short, long)]
        baud: Option<u32>,

        /// Disable RTS/CTS flow control
        #[arg(long)]
        no_flow_control: bool,

        #[command(flatten)]
        framing: FramingArgs,
    },

    /// Frame a file of captured raw bytes
    Replay {
        /// Capture file
        file: PathBuf,

        #[command(flatten)]
        framing: FramingArgs,
    },

    /// List available serial ports
    #[cfg(feature = "serial")]
    Ports,

    /// Print the effective configuration as TOML
    Config,
}

#[derive(Args)]
struct FramingArgs {
    /// Bytes requested per read call
    #[arg(long)]
    chunk_size: Option<usize>,

    /// Largest message accepted before reading fails
    #[arg(long)]
    max_message: Option<usize>,

    /// Which bytes are compared against the sentinel
    #[arg(long, value_enum)]
    sentinel_mode: Option<SentinelMode>,

    /// Prefix each message with a timestamp
    #[arg(long)]
    timestamps: bool,

    /// Also write messages to a log file
    #[arg(short, long)]
    log: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = run(cli) {
        eprintln!("{} {:#}", "[ERROR]".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let mut config = match cli.config {
        Some(ref path) => AppConfig::load(path)?,
        None => AppConfig::default(),
    };

    match cli.command {
        Commands::Read {
            port,
            baud,
            no_flow_control,
            framing,
        } => {
            if let Some(p) = port {
                config.port.path = p;
            }
            if let Some(b) = baud {
                config.port.baud_rate = b;
            }
            if no_flow_control {
                config.port.flow_control = FlowControl::None;
            }
            apply_framing(&mut config, framing);
            config.validate()?;

            handle_read(&config)
        }

        Commands::Replay { file, framing } => {
            apply_framing(&mut config, framing);
            config.validate()?;

            print_framing(&config);
            let summary = run_replay(&file, config.reader_config(), build_sink(&config.output)?)?;
            print_summary(&summary);
            Ok(())
        }

        #[cfg(feature = "serial")]
        Commands::Ports => serial::port::print_ports(),

        Commands::Config => {
            let text = config
                .to_toml()
                .context("Failed to serialize configuration")?;
            print!("{}", text);
            Ok(())
        }
    }
}

#[cfg(unix)]
fn handle_read(config: &AppConfig) -> Result<()> {
    print_framing(config);
    let summary = serial::monitor::run_device(
        &config.port_config(),
        config.reader_config(),
        build_sink(&config.output)?,
    )?;
    print_summary(&summary);
    Ok(())
}

#[cfg(not(unix))]
fn handle_read(_config: &AppConfig) -> Result<()> {
    anyhow::bail!("Reading from a serial device is only supported on unix hosts")
}

fn apply_framing(config: &mut AppConfig, args: FramingArgs) {
    if let Some(n) = args.chunk_size {
        config.framing.chunk_size = n;
    }
    if let Some(n) = args.max_message {
        config.framing.max_message_len = n;
    }
    if let Some(mode) = args.sentinel_mode {
        config.framing.sentinel_mode = mode;
    }
    if args.timestamps {
        config.output.timestamps = true;
    }
    if let Some(log) = args.log {
        config.output.log_file = Some(log);
    }
}

fn build_sink(output: &OutputSection) -> Result<MessageSink<Stderr>> {
    let sink = MessageSink::new(io::stderr()).with_timestamps(output.timestamps);
    match output.log_file {
        Some(ref path) => {
            println!("{} Logging to: {}", "[LOG]".cyan().bold(), path.display());
            sink.with_log_file(path)
        }
        None => Ok(sink),
    }
}

fn print_framing(config: &AppConfig) {
    println!(
        "{} Chunk size {}, sentinel 0x{:02X} ({:?})",
        "[*]".cyan().bold(),
        config.framing.chunk_size,
        config.framing.sentinel,
        config.framing.sentinel_mode
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_read_flags_override_config() {
        let cli = Cli::parse_from([
            "serial-frame-dump",
            "read",
            "-p",
            "/dev/ttyS3",
            "--chunk-size",
            "8",
            "--sentinel-mode",
            "message-leading",
        ]);

        let Commands::Read { port, framing, .. } = cli.command else {
            panic!("expected read command");
        };
        assert_eq!(port.as_deref(), Some("/dev/ttyS3"));

        let mut config = AppConfig::default();
        apply_framing(&mut config, framing);
        assert_eq!(config.framing.chunk_size, 8);
        assert_eq!(config.framing.sentinel_mode, SentinelMode::MessageLeading);
        assert_eq!(config.framing.max_message_len, 512);
    }
}
