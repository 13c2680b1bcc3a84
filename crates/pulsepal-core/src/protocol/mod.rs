//! The binary command protocol: frame construction for every outbound
//! operation and parsing of the two inbound payloads (handshake response
//! and settings readback).

pub mod decode;
pub mod encode;
pub mod opcode;

use thiserror::Error;

/// Errors raised while building or parsing wire frames.
///
/// Domain violations (bad voltages, channels, and so on) are
/// [`ParameterError`](crate::domain::ParameterError)s instead; this type
/// covers the framing layer itself.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// An inbound frame had the wrong length.
    #[error("expected a {expected}-byte frame, got {got} bytes")]
    UnexpectedLength { expected: usize, got: usize },

    /// An inbound field held a value outside its encoding.
    #[error("invalid value {value} for field {field}")]
    InvalidFieldValue { field: &'static str, value: u8 },

    /// Text destined for the device must be ASCII.
    #[error("{field} contains non-ASCII characters")]
    NonAsciiText { field: &'static str },

    /// A length-prefixed payload exceeds its one-byte length field.
    #[error("{field} is {len} bytes; the wire limit is {max}")]
    TooLong {
        field: &'static str,
        len: usize,
        max: usize,
    },
}
