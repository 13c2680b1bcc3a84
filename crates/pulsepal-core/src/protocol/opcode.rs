//! Wire-format constants: the frame marker, opcode table, and the fixed
//! bytes of the handshake and acknowledgement discipline.

/// Every frame in either direction starts with this marker byte, used as a
/// framing sanity check by the device's serial menu.
pub const FRAME_MARKER: u8 = 213;

/// Acknowledgement byte returned after each acknowledged mutating command.
pub const ACK: u8 = 1;

/// Response byte the device returns to a handshake request.
pub const HANDSHAKE_ACK: u8 = 75;

/// Byte separating the two display lines inside a set-display payload.
pub const DISPLAY_LINE_SEPARATOR: u8 = 254;

/// Firmware versions below this ran on Model 1 hardware.
pub const MODEL2_MIN_FIRMWARE: u32 = 20;

/// Firmware 20 has a known Pulse Gated trigger bug with multiple inputs;
/// the session logs an update notice when it sees this version.
pub const FIRMWARE_WITH_GATED_TRIGGER_BUG: u32 = 20;

/// Command opcodes, sent as the second frame byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    Handshake = 72,
    SyncAllParams = 73,
    ProgramParam = 74,
    CustomTrain1 = 75,
    CustomTrain2 = 76,
    TriggerChannels = 77,
    SetDisplay = 78,
    SetFixedVoltage = 79,
    AbortPulseTrains = 80,
    Terminate = 81,
    SetContinuousLoop = 82,
    ClientName = 89,
    SdCard = 90,
}

/// Sub-opcodes of the SD-card settings command (opcode 90).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SdOp {
    Save = 1,
    Load = 2,
    Delete = 3,
}

/// Trigger-parameter codes are offset by 128 on the wire to distinguish
/// them from output-parameter codes in the shared program opcode.
pub const TRIGGER_PARAM_OFFSET: u8 = 128;
