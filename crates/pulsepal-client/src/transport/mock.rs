//! Mock transport for session tests.
//!
//! A real Pulse Pal answers most commands with a single acknowledgement
//! byte, so a test scripts the device side by queueing response bytes up
//! front and asserting on the recorded frames afterwards:
//!
//! ```ignore
//! let mut transport = MockTransport::new();
//! transport.queue_handshake(23);
//! transport.queue_ack();
//!
//! let mut pal = PulsePal::connect(&mut transport).unwrap();
//! pal.set_parameter(OutputChannel::Ch1, OutputParam::Phase1Voltage,
//!                   ParamValue::Volts(10.0)).unwrap();
//! drop(pal);
//!
//! assert_eq!(transport.writes[1], [213, 74, 2, 1, 255, 255]);
//! ```
//!
//! An exhausted response queue makes `read_exact` fail with
//! `UnexpectedEof`, which is exactly how a silent device surfaces: as an
//! acknowledgement timeout.

use std::collections::VecDeque;
use std::io;

use pulsepal_core::protocol::opcode::{ACK, HANDSHAKE_ACK};

use super::Transport;

/// Records every written frame and plays back a scripted byte queue.
#[derive(Debug, Default)]
pub struct MockTransport {
    /// One entry per `write_all` call, in order.
    pub writes: Vec<Vec<u8>>,
    /// Bytes the "device" will answer with, consumed front to back.
    pub responses: VecDeque<u8>,
    /// When `true`, every write fails with `BrokenPipe`.
    pub fail_writes: bool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues arbitrary response bytes.
    pub fn queue(&mut self, bytes: &[u8]) {
        self.responses.extend(bytes.iter().copied());
    }

    /// Queues a single acknowledgement byte.
    pub fn queue_ack(&mut self) {
        self.responses.push_back(ACK);
    }

    /// Queues a well-formed handshake response for the given firmware
    /// version.
    pub fn queue_handshake(&mut self, firmware_version: u32) {
        self.responses.push_back(HANDSHAKE_ACK);
        self.queue(&firmware_version.to_le_bytes());
    }
}

impl Transport for MockTransport {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        if self.fail_writes {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock failure"));
        }
        self.writes.push(bytes.to_vec());
        Ok(())
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> io::Result<()> {
        for slot in buf.iter_mut() {
            *slot = self.responses.pop_front().ok_or_else(|| {
                io::Error::new(io::ErrorKind::UnexpectedEof, "response queue exhausted")
            })?;
        }
        Ok(())
    }
}
