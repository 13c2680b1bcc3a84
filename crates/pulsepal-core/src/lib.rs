//! Core library for driving the Pulse Pal stimulus generator.
//!
//! This crate is transport-free: [`domain`] models the device's parameter
//! space and unit encodings, and [`protocol`] turns that model into the
//! exact byte frames the firmware's serial menu consumes. Everything that
//! touches a serial port lives in the client crate.

pub mod domain;
pub mod protocol;

pub use domain::{
    ChannelParameters, CustomTrain, HardwareGeneration, OutputChannel, OutputParam, ParamValue,
    ParameterError, ParameterStore, Pulse, TrainSlot, TriggerChannel, TriggerMode,
};
pub use protocol::ProtocolError;
