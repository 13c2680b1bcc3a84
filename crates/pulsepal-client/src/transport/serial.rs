//! USB-serial transport backed by the `serialport` crate.
//!
//! The Pulse Pal enumerates as a CDC virtual COM port, so the baud rate is
//! nominal; 115200 matches the vendor client libraries. The read timeout
//! set here is what bounds every acknowledgement wait in the session.

use std::io::{Read, Write};
use std::time::Duration;

use tracing::debug;

use super::Transport;

/// Nominal baud rate for the device's virtual COM port.
pub const DEFAULT_BAUD_RATE: u32 = 115_200;

/// Default bound on any single read, and therefore on an ack wait.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// A serial port opened exclusively for one device session.
pub struct SerialTransport {
    port: Box<dyn serialport::SerialPort>,
}

impl SerialTransport {
    /// Opens `path` (e.g. `/dev/ttyACM0` or `COM3`) with the given baud
    /// rate and read timeout.
    pub fn open(
        path: &str,
        baud_rate: u32,
        timeout: Duration,
    ) -> Result<Self, serialport::Error> {
        debug!(path, baud_rate, ?timeout, "opening serial port");
        let port = serialport::new(path, baud_rate).timeout(timeout).open()?;
        Ok(Self { port })
    }

    /// Opens `path` with [`DEFAULT_BAUD_RATE`] and [`DEFAULT_TIMEOUT`].
    pub fn open_default(path: &str) -> Result<Self, serialport::Error> {
        Self::open(path, DEFAULT_BAUD_RATE, DEFAULT_TIMEOUT)
    }
}

impl Transport for SerialTransport {
    fn write_all(&mut self, bytes: &[u8]) -> std::io::Result<()> {
        self.port.write_all(bytes)?;
        self.port.flush()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> std::io::Result<()> {
        self.port.read_exact(buf)
    }
}
