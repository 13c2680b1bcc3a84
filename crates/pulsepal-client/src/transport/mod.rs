//! Byte-stream transport seam between the session and the hardware.
//!
//! The session never names a serial port directly; it drives anything that
//! implements [`Transport`]. Production code uses [`serial::SerialTransport`],
//! tests use [`mock::MockTransport`].

pub mod mock;
pub mod serial;

use std::io;

/// A blocking, exclusively owned byte stream to one device.
///
/// Read timeouts belong to the implementation: `read_exact` must return an
/// error (rather than block forever) when the device stays silent, which is
/// what turns a missing acknowledgement into a session error.
pub trait Transport {
    /// Writes the whole frame.
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Reads exactly `buf.len()` bytes.
    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()>;
}

/// Forwarding impl so a test can lend its transport to a session and keep
/// ownership for assertions afterwards.
impl<T: Transport + ?Sized> Transport for &mut T {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        (**self).write_all(bytes)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        (**self).read_exact(buf)
    }
}
