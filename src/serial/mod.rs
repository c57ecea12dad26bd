//! Serial port communication module
//!
//! This module provides functionality for:
//! - Configuring a device for raw, blocking reads and restoring it afterwards
//! - Running the framed message monitor over a device or a capture file
//! - Listing available serial ports (requires the `serial` feature)

pub mod monitor;
pub mod port;
#[cfg(unix)]
pub mod session;

pub use port::{FlowControl, PortConfig};
#[cfg(unix)]
pub use session::PortSession;
