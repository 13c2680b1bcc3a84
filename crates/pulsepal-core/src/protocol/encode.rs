//! Builds the byte frame for every outbound command.
//!
//! All multi-byte integers are little-endian. Frames carrying parameter
//! values depend on the hardware generation: Model 1 carries voltages as
//! single DAC bytes and prefixes custom-train payloads with a USB packet
//! correction byte, Model 2 widens voltages to u16.

use crate::domain::params::{
    OutputChannel, OutputParam, ParamKind, ParamValue, ParameterError, ParameterStore,
    TriggerChannel, TriggerMode, TRIGGER_MODE_CODE,
};
use crate::domain::train::{CustomTrain, TrainSlot};
use crate::domain::units::{seconds_to_cycles, volts_to_bits, HardwareGeneration};
use crate::protocol::opcode::{
    Opcode, SdOp, DISPLAY_LINE_SEPARATOR, FRAME_MARKER, TRIGGER_PARAM_OFFSET,
};
use crate::protocol::ProtocolError;

/// Exact sync-all frame length per generation (marker and opcode included).
pub const SYNC_FRAME_LEN_MODEL1: usize = 2 + 32 * 4 + 28 + 8 + 2;
pub const SYNC_FRAME_LEN_MODEL2: usize = 2 + 32 * 4 + 12 * 2 + 16 + 8 + 2;

fn frame(op: Opcode) -> Vec<u8> {
    vec![FRAME_MARKER, op as u8]
}

fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_le_bytes());
}

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_le_bytes());
}

/// A parameter value converted to its wire representation.
enum WireValue {
    U8(u8),
    U16(u16),
    U32(u32),
}

fn wire_value(
    generation: HardwareGeneration,
    param: OutputParam,
    value: ParamValue,
) -> Result<WireValue, ParameterError> {
    value.validate_for(param)?;
    match (param.kind(), value) {
        (ParamKind::Voltage, ParamValue::Volts(v)) => {
            let bits = volts_to_bits(v, generation)?;
            Ok(match generation {
                HardwareGeneration::Model1 => WireValue::U8(bits as u8),
                HardwareGeneration::Model2 => WireValue::U16(bits as u16),
            })
        }
        (ParamKind::Duration, ParamValue::Seconds(s)) => {
            Ok(WireValue::U32(seconds_to_cycles(s)?))
        }
        (ParamKind::Flag, ParamValue::Flag(b)) => Ok(WireValue::U8(b as u8)),
        (ParamKind::Selector { .. }, ParamValue::Selector(v)) => Ok(WireValue::U8(v)),
        // validate_for has already rejected class mismatches.
        (kind, _) => Err(ParameterError::WrongValueKind {
            param: param.name(),
            expected: match kind {
                ParamKind::Flag => "flag",
                ParamKind::Voltage => "voltage",
                ParamKind::Duration => "duration",
                ParamKind::Selector { .. } => "selector",
            },
        }),
    }
}

/// Handshake request (opcode 72).
pub fn handshake() -> Vec<u8> {
    frame(Opcode::Handshake)
}

/// Client-name announcement (opcode 89), sent once after a successful
/// handshake. Not acknowledged.
pub fn client_name(name: &str) -> Result<Vec<u8>, ProtocolError> {
    if !name.is_ascii() {
        return Err(ProtocolError::NonAsciiText {
            field: "client name",
        });
    }
    let mut buf = frame(Opcode::ClientName);
    buf.extend_from_slice(name.as_bytes());
    Ok(buf)
}

/// Program one output-channel parameter (opcode 74). The value's wire
/// width follows the parameter's class and the hardware generation.
pub fn program_output_param(
    generation: HardwareGeneration,
    channel: OutputChannel,
    param: OutputParam,
    value: ParamValue,
) -> Result<Vec<u8>, ParameterError> {
    let wire = wire_value(generation, param, value)?;
    let mut buf = frame(Opcode::ProgramParam);
    buf.push(param.code());
    buf.push(channel.number());
    match wire {
        WireValue::U8(v) => buf.push(v),
        WireValue::U16(v) => push_u16(&mut buf, v),
        WireValue::U32(v) => push_u32(&mut buf, v),
    }
    Ok(buf)
}

/// Program a trigger-channel parameter (opcode 74 with the code offset by
/// 128). The only trigger parameter is the trigger mode.
pub fn program_trigger_param(channel: TriggerChannel, mode: TriggerMode) -> Vec<u8> {
    let mut buf = frame(Opcode::ProgramParam);
    buf.push(TRIGGER_MODE_CODE + TRIGGER_PARAM_OFFSET);
    buf.push(channel.number());
    buf.push(mode as u8);
    buf
}

/// Sync-all frame (opcode 73): the complete parameter store in the fixed
/// bulk layout the firmware expects.
///
/// Both generations start with 32 u32 time fields (channel-major, eight
/// fields per channel). Model 1 then interleaves DAC voltage bytes into a
/// 28-byte per-channel block; Model 2 carries voltages as a separate
/// 12-word u16 block followed by a field-major 16-byte flag block. Both
/// end with the 8 trigger-link bytes and 2 trigger-mode bytes.
pub fn sync_all(
    generation: HardwareGeneration,
    store: &ParameterStore,
) -> Result<Vec<u8>, ParameterError> {
    let mut buf = frame(Opcode::SyncAllParams);

    for channel in OutputChannel::ALL {
        let ch = store.channel(channel);
        for seconds in [
            ch.phase1_duration,
            ch.inter_phase_interval,
            ch.phase2_duration,
            ch.inter_pulse_interval,
            ch.burst_duration,
            ch.inter_burst_interval,
            ch.pulse_train_duration,
            ch.pulse_train_delay,
        ] {
            push_u32(&mut buf, seconds_to_cycles(seconds)?);
        }
    }

    match generation {
        HardwareGeneration::Model1 => {
            for channel in OutputChannel::ALL {
                let ch = store.channel(channel);
                buf.push(ch.is_biphasic as u8);
                buf.push(volts_to_bits(ch.phase1_voltage, generation)? as u8);
                buf.push(volts_to_bits(ch.phase2_voltage, generation)? as u8);
                buf.push(ch.custom_train_id);
                buf.push(ch.custom_train_target);
                buf.push(ch.custom_train_loop as u8);
                buf.push(volts_to_bits(ch.resting_voltage, generation)? as u8);
            }
        }
        HardwareGeneration::Model2 => {
            for channel in OutputChannel::ALL {
                let ch = store.channel(channel);
                push_u16(&mut buf, volts_to_bits(ch.phase1_voltage, generation)? as u16);
                push_u16(&mut buf, volts_to_bits(ch.phase2_voltage, generation)? as u16);
                push_u16(&mut buf, volts_to_bits(ch.resting_voltage, generation)? as u16);
            }
            for channel in OutputChannel::ALL {
                buf.push(store.channel(channel).is_biphasic as u8);
            }
            for channel in OutputChannel::ALL {
                buf.push(store.channel(channel).custom_train_id);
            }
            for channel in OutputChannel::ALL {
                buf.push(store.channel(channel).custom_train_target);
            }
            for channel in OutputChannel::ALL {
                buf.push(store.channel(channel).custom_train_loop as u8);
            }
        }
    }

    for channel in OutputChannel::ALL {
        buf.push(store.channel(channel).link_trigger_channel_1 as u8);
    }
    for channel in OutputChannel::ALL {
        buf.push(store.channel(channel).link_trigger_channel_2 as u8);
    }
    for trigger in TriggerChannel::ALL {
        buf.push(store.trigger(trigger).trigger_mode as u8);
    }

    Ok(buf)
}

fn train_opcode(slot: TrainSlot) -> Opcode {
    match slot {
        TrainSlot::One => Opcode::CustomTrain1,
        TrainSlot::Two => Opcode::CustomTrain2,
    }
}

fn train_frame(
    generation: HardwareGeneration,
    slot: TrainSlot,
    times_cycles: &[u32],
    voltage_bits: &[u32],
) -> Vec<u8> {
    let mut buf = frame(train_opcode(slot));
    if generation == HardwareGeneration::Model1 {
        // USB packet correction byte required by Model 1 firmware.
        buf.push(0);
    }
    push_u32(&mut buf, times_cycles.len() as u32);
    for &cycles in times_cycles {
        push_u32(&mut buf, cycles);
    }
    for &bits in voltage_bits {
        match generation {
            HardwareGeneration::Model1 => buf.push(bits as u8),
            HardwareGeneration::Model2 => push_u16(&mut buf, bits as u16),
        }
    }
    buf
}

/// Custom pulse train upload (opcode 75 for slot 1, 76 for slot 2).
pub fn custom_train(
    generation: HardwareGeneration,
    slot: TrainSlot,
    train: &CustomTrain,
) -> Result<Vec<u8>, ParameterError> {
    let mut times = Vec::with_capacity(train.len());
    let mut bits = Vec::with_capacity(train.len());
    for pulse in train.pulses() {
        times.push(seconds_to_cycles(pulse.time)?);
        bits.push(volts_to_bits(pulse.voltage, generation)?);
    }
    Ok(train_frame(generation, slot, &times, &bits))
}

/// Custom waveform upload: the same frame as [`custom_train`], with pulse
/// times synthesized as `i * pulse_width_cycles`. The multiplication
/// happens in cycle units so consecutive samples land exactly one quantized
/// pulse width apart.
pub fn custom_waveform(
    generation: HardwareGeneration,
    slot: TrainSlot,
    pulse_width: f64,
    voltages: &[f64],
) -> Result<Vec<u8>, ParameterError> {
    if voltages.is_empty() {
        return Err(ParameterError::EmptyTrain);
    }
    let width_cycles = seconds_to_cycles(pulse_width)?;
    let mut times = Vec::with_capacity(voltages.len());
    let mut bits = Vec::with_capacity(voltages.len());
    for (i, &volts) in voltages.iter().enumerate() {
        let cycles = i as u64 * width_cycles as u64;
        if cycles > u32::MAX as u64 {
            return Err(ParameterError::DurationTooLong {
                seconds: i as f64 * pulse_width,
            });
        }
        times.push(cycles as u32);
        bits.push(volts_to_bits(volts, generation)?);
    }
    Ok(train_frame(generation, slot, &times, &bits))
}

/// Software trigger (opcode 77): one bit per output channel.
pub fn trigger_channels(channels: [bool; 4]) -> Vec<u8> {
    let mut mask = 0u8;
    for (bit, &on) in channels.iter().enumerate() {
        if on {
            mask |= 1 << bit;
        }
    }
    let mut buf = frame(Opcode::TriggerChannels);
    buf.push(mask);
    buf
}

/// Abort all playing pulse trains (opcode 80).
pub fn abort_pulse_trains() -> Vec<u8> {
    frame(Opcode::AbortPulseTrains)
}

/// Continuous-loop toggle (opcode 82). Fire-and-forget: no acknowledgement.
pub fn continuous_loop(channel: OutputChannel, enabled: bool) -> Vec<u8> {
    let mut buf = frame(Opcode::SetContinuousLoop);
    buf.push(channel.number());
    buf.push(enabled as u8);
    buf
}

/// Fixed output voltage (opcode 79); width follows the generation's DAC.
pub fn fixed_voltage(
    generation: HardwareGeneration,
    channel: OutputChannel,
    volts: f64,
) -> Result<Vec<u8>, ParameterError> {
    let bits = volts_to_bits(volts, generation)?;
    let mut buf = frame(Opcode::SetFixedVoltage);
    buf.push(channel.number());
    match generation {
        HardwareGeneration::Model1 => buf.push(bits as u8),
        HardwareGeneration::Model2 => push_u16(&mut buf, bits as u16),
    }
    Ok(buf)
}

/// Set the device's two-line OLED text (opcode 78). Both lines must be
/// ASCII and the joined payload must fit the one-byte length field.
pub fn set_display(line1: &str, line2: &str) -> Result<Vec<u8>, ProtocolError> {
    for (field, line) in [("display line 1", line1), ("display line 2", line2)] {
        if !line.is_ascii() {
            return Err(ProtocolError::NonAsciiText { field });
        }
    }
    let len = line1.len() + 1 + line2.len();
    if len > u8::MAX as usize {
        return Err(ProtocolError::TooLong {
            field: "display text",
            len,
            max: u8::MAX as usize,
        });
    }
    let mut buf = frame(Opcode::SetDisplay);
    buf.push(len as u8);
    buf.extend_from_slice(line1.as_bytes());
    buf.push(DISPLAY_LINE_SEPARATOR);
    buf.extend_from_slice(line2.as_bytes());
    Ok(buf)
}

/// SD-card settings-file command (opcode 90): save, load, or delete a
/// named settings file on the device's card. Model 2 only; the session
/// enforces the generation guard.
pub fn sd_command(op: SdOp, filename: &str) -> Result<Vec<u8>, ProtocolError> {
    if !filename.is_ascii() {
        return Err(ProtocolError::NonAsciiText {
            field: "settings file name",
        });
    }
    if filename.len() > u8::MAX as usize {
        return Err(ProtocolError::TooLong {
            field: "settings file name",
            len: filename.len(),
            max: u8::MAX as usize,
        });
    }
    let mut buf = frame(Opcode::SdCard);
    buf.push(op as u8);
    buf.push(filename.len() as u8);
    buf.extend_from_slice(filename.as_bytes());
    Ok(buf)
}

/// Session terminate (opcode 81). The device persists its last-synced
/// parameters on receipt.
pub fn terminate() -> Vec<u8> {
    frame(Opcode::Terminate)
}
