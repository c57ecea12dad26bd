//! Raw-mode terminal session on a serial device
//!
//! Opens the device read-only without making it the controlling terminal,
//! saves its termios, and switches it to non-canonical raw input. The saved
//! settings are written back by [`PortSession::restore`], or on drop if the
//! session was never restored explicitly.

use crate::serial::port::{FlowControl, PortConfig};
use anyhow::{anyhow, Context, Result};
use log::{debug, warn};
use std::fs::{File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::fs::OpenOptionsExt;
use std::os::unix::io::{AsRawFd, RawFd};

/// An open, configured serial device
pub struct PortSession {
    device: File,
    path: String,
    saved: Option<libc::termios>,
}

impl PortSession {
    /// Open and configure the device named by `config.port_path`
    pub fn open(config: &PortConfig) -> Result<Self> {
        let device = OpenOptions::new()
            .read(true)
            .custom_flags(libc::O_NOCTTY)
            .open(&config.port_path)
            .with_context(|| format!("Failed to open serial port: {}", config.port_path))?;

        Self::configure(device, config)
    }

    /// Configure an already opened terminal device
    pub fn configure(device: File, config: &PortConfig) -> Result<Self> {
        let fd = device.as_raw_fd();
        let saved = get_attrs(fd)
            .with_context(|| format!("Failed to read terminal settings: {}", config.port_path))?;
        let raw = raw_attrs(config)?;

        cvt(unsafe { libc::tcflush(fd, libc::TCIFLUSH) })
            .with_context(|| format!("Failed to flush input: {}", config.port_path))?;
        set_attrs(fd, &raw)
            .with_context(|| format!("Failed to apply terminal settings: {}", config.port_path))?;

        debug!(
            "Configured {} at {} baud (flow control: {:?}, VMIN={}, VTIME={})",
            config.port_path,
            config.baud_rate,
            config.flow_control,
            config.min_read_bytes,
            config.inter_byte_timeout
        );

        Ok(Self {
            device,
            path: config.port_path.clone(),
            saved: Some(saved),
        })
    }

    /// Write the saved settings back to the device.
    ///
    /// Returns `Ok(true)` the first time and `Ok(false)` on every later call.
    pub fn restore(&mut self) -> io::Result<bool> {
        let Some(saved) = self.saved.take() else {
            return Ok(false);
        };
        set_attrs(self.device.as_raw_fd(), &saved)?;
        debug!("Restored terminal settings on {}", self.path);
        Ok(true)
    }
}

impl Read for PortSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.device.read(buf)
    }
}

impl Drop for PortSession {
    fn drop(&mut self) {
        if self.saved.is_some() {
            debug!("Session on {} dropped without explicit restore", self.path);
            if let Err(e) = self.restore() {
                warn!("Failed to restore terminal settings on {}: {}", self.path, e);
            }
        }
    }
}

fn cvt(ret: libc::c_int) -> io::Result<()> {
    if ret == -1 {
        Err(io::Error::last_os_error())
    } else {
        Ok(())
    }
}

fn get_attrs(fd: RawFd) -> io::Result<libc::termios> {
    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    cvt(unsafe { libc::tcgetattr(fd, &mut tio) })?;
    Ok(tio)
}

fn set_attrs(fd: RawFd, tio: &libc::termios) -> io::Result<()> {
    cvt(unsafe { libc::tcsetattr(fd, libc::TCSANOW, tio) })
}

fn speed_constant(baud_rate: u32) -> Option<libc::speed_t> {
    let speed = match baud_rate {
        1200 => libc::B1200,
        2400 => libc::B2400,
        4800 => libc::B4800,
        9600 => libc::B9600,
        19200 => libc::B19200,
        38400 => libc::B38400,
        57600 => libc::B57600,
        115200 => libc::B115200,
        230400 => libc::B230400,
        _ => return None,
    };
    Some(speed)
}

/// Build the raw termios for `config` from a zeroed struct
fn raw_attrs(config: &PortConfig) -> Result<libc::termios> {
    let speed = speed_constant(config.baud_rate)
        .ok_or_else(|| anyhow!("Unsupported baud rate: {}", config.baud_rate))?;

    let mut tio: libc::termios = unsafe { std::mem::zeroed() };
    tio.c_cflag = libc::CS8 | libc::CLOCAL | libc::CREAD;
    if config.flow_control == FlowControl::Hardware {
        tio.c_cflag |= libc::CRTSCTS;
    }
    tio.c_iflag = libc::IGNPAR;
    tio.c_oflag = 0;
    tio.c_lflag = 0;
    tio.c_cc[libc::VTIME] = config.inter_byte_timeout;
    tio.c_cc[libc::VMIN] = config.min_read_bytes;

    cvt(unsafe { libc::cfsetispeed(&mut tio, speed) }).context("Failed to set input speed")?;
    cvt(unsafe { libc::cfsetospeed(&mut tio, speed) }).context("Failed to set output speed")?;

    Ok(tio)
}

#[cfg(all(test, target_os = "linux"))]
pub(crate) mod tests {
    use super::*;
    use crate::frame::{FramedReader, MessageSink, ReaderConfig};
    use crate::serial::monitor::{SessionEnd, SerialMonitor};
    use std::io::Write;
    use std::os::unix::io::FromRawFd;
    use std::ptr;

    /// Returns (master, slave)
    pub(crate) fn open_pty() -> (File, File) {
        let mut master: libc::c_int = -1;
        let mut slave: libc::c_int = -1;
        let ret = unsafe {
            libc::openpty(
                &mut master,
                &mut slave,
                ptr::null_mut(),
                ptr::null_mut(),
                ptr::null_mut(),
            )
        };
        assert_eq!(ret, 0, "openpty failed: {}", io::Error::last_os_error());
        unsafe { (File::from_raw_fd(master), File::from_raw_fd(slave)) }
    }

    pub(crate) fn local_flags(file: &File) -> libc::tcflag_t {
        get_attrs(file.as_raw_fd()).unwrap().c_lflag
    }

    fn pty_config() -> PortConfig {
        PortConfig::new("pty")
    }

    #[test]
    fn test_raw_attrs() {
        let tio = raw_attrs(&PortConfig::default()).unwrap();
        assert_eq!(tio.c_lflag, 0);
        assert_eq!(tio.c_iflag, libc::IGNPAR);
        assert_ne!(tio.c_cflag & libc::CRTSCTS, 0);
        assert_eq!(tio.c_cc[libc::VMIN], 1);
        assert_eq!(tio.c_cc[libc::VTIME], 0);
        assert_eq!(unsafe { libc::cfgetispeed(&tio) }, libc::B38400);
    }

    #[test]
    fn test_raw_attrs_without_flow_control() {
        let config = PortConfig::default().with_flow_control(FlowControl::None);
        let tio = raw_attrs(&config).unwrap();
        assert_eq!(tio.c_cflag & libc::CRTSCTS, 0);
    }

    #[test]
    fn test_unsupported_baud_is_rejected() {
        let config = PortConfig::default().with_baud_rate(12345);
        assert!(raw_attrs(&config).is_err());
    }

    #[test]
    fn test_open_missing_device_fails() {
        let config = PortConfig::new("/dev/does-not-exist-serial-frame-dump");
        let err = PortSession::open(&config).err().unwrap();
        assert!(err.to_string().contains("Failed to open serial port"));
    }

    #[test]
    fn test_configure_applies_raw_mode() {
        let (_master, slave) = open_pty();
        let observer = slave.try_clone().unwrap();

        let _session = PortSession::configure(slave, &pty_config()).unwrap();
        let applied = get_attrs(observer.as_raw_fd()).unwrap();
        assert_eq!(applied.c_lflag, 0);
        assert_eq!(applied.c_cc[libc::VMIN], 1);
        assert_eq!(applied.c_cc[libc::VTIME], 0);
    }

    #[test]
    fn test_session_restores_once_after_final_message() {
        let (mut master, slave) = open_pty();
        let observer = slave.try_clone().unwrap();
        let original = get_attrs(observer.as_raw_fd()).unwrap();

        let mut session = PortSession::configure(slave, &pty_config()).unwrap();

        // a lone sentinel message, longer than one chunk
        let mut wire = vec![b'z'];
        wire.extend(std::iter::repeat(0x01).take(b'z' as usize));
        master.write_all(&wire).unwrap();

        let out = {
            let reader = FramedReader::new(&mut session, ReaderConfig::default());
            let mut monitor = SerialMonitor::new(reader, MessageSink::new(Vec::new()));
            let summary = monitor.run().unwrap();
            assert_eq!(summary.messages, 1);
            assert_eq!(summary.bytes, 123);
            assert_eq!(summary.end, SessionEnd::Sentinel);
            monitor.into_sink().into_inner()
        };

        // still raw until the session is restored
        assert_eq!(get_attrs(observer.as_raw_fd()).unwrap().c_lflag, 0);

        assert!(session.restore().unwrap());
        assert!(!session.restore().unwrap());

        let restored = get_attrs(observer.as_raw_fd()).unwrap();
        assert_eq!(restored.c_lflag, original.c_lflag);
        assert_eq!(restored.c_iflag, original.c_iflag);

        let out = String::from_utf8(out).unwrap();
        assert_eq!(out, format!("7A{}:123\n", "01".repeat(122)));
    }

    #[test]
    fn test_drop_restores_settings() {
        let (_master, slave) = open_pty();
        let observer = slave.try_clone().unwrap();
        let original = get_attrs(observer.as_raw_fd()).unwrap();

        drop(PortSession::configure(slave, &pty_config()).unwrap());

        assert_eq!(get_attrs(observer.as_raw_fd()).unwrap().c_lflag, original.c_lflag);
    }
}
