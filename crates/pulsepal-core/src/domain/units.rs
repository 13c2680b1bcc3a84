//! Conversions between physical units and device integer encodings.
//!
//! The Pulse Pal represents voltages as DAC codes (8-bit on Model 1,
//! 16-bit on Model 2) and durations as counts of its 50 µs update cycle.
//! Voltage conversion quantizes the input to 0.1 mV and then performs an
//! exact integer ceiling division, so the ±10 V rails map deterministically
//! to 0 and the full DAC code regardless of host floating-point behaviour.

use serde::{Deserialize, Serialize};

use super::params::ParameterError;

/// The device's internal update rate. All durations travel on the wire as
/// unsigned 32-bit multiples of one cycle (1/20000 s = 50 µs).
pub const CYCLE_FREQUENCY_HZ: u32 = 20_000;

/// Longest representable duration: `u32::MAX` cycles (≈ 59.65 hours).
pub const MAX_DURATION_SECONDS: f64 = u32::MAX as f64 / CYCLE_FREQUENCY_HZ as f64;

/// Output voltage domain in volts.
pub const VOLTAGE_MIN: f64 = -10.0;
pub const VOLTAGE_MAX: f64 = 10.0;

// Voltages are quantized to 0.1 mV steps before conversion, so the full
// ±10 V span covers 200 000 steps.
const TENTH_MV_PER_VOLT: i64 = 10_000;
const SPAN_TENTH_MV: i64 = 200_000;

/// Hardware generation, inferred from the firmware version at handshake
/// time and fixed for the remainder of a session.
///
/// The two generations speak incompatible wire dialects: Model 1 carries
/// voltages as single bytes and prefixes custom-train payloads with a USB
/// packet correction byte; Model 2 widens voltages to 16 bits and adds the
/// SD-card settings opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HardwareGeneration {
    Model1,
    Model2,
}

impl HardwareGeneration {
    /// Model 1 spanned firmware versions 1–19; version 20 and later is
    /// Model 2 hardware.
    pub fn from_firmware_version(version: u32) -> Self {
        if version < crate::protocol::opcode::MODEL2_MIN_FIRMWARE {
            HardwareGeneration::Model1
        } else {
            HardwareGeneration::Model2
        }
    }

    /// Highest DAC code for this generation (255 or 65535).
    pub fn dac_bit_max(self) -> u32 {
        match self {
            HardwareGeneration::Model1 => 255,
            HardwareGeneration::Model2 => 65_535,
        }
    }
}

/// Converts a voltage in [-10, 10] V to the generation's DAC code:
/// `ceil(((v + 10) / 20) * dac_bit_max)`.
///
/// Out-of-domain input is rejected, never clamped.
///
/// # Examples
///
/// ```rust
/// use pulsepal_core::domain::units::{volts_to_bits, HardwareGeneration};
///
/// assert_eq!(volts_to_bits(-10.0, HardwareGeneration::Model1), Ok(0));
/// assert_eq!(volts_to_bits(10.0, HardwareGeneration::Model2), Ok(65535));
/// ```
pub fn volts_to_bits(volts: f64, generation: HardwareGeneration) -> Result<u32, ParameterError> {
    if !volts.is_finite() || !(VOLTAGE_MIN..=VOLTAGE_MAX).contains(&volts) {
        return Err(ParameterError::ValueOutOfDomain {
            what: "voltage (V)",
            value: volts,
        });
    }
    // Quantize to 0.1 mV, then take an exact integer ceiling of
    // (offset / span) * dac_bit_max. Offset from the -10 V rail is in
    // [0, 200_000].
    let offset_tenth_mv = (volts * TENTH_MV_PER_VOLT as f64).round() as i64 + 10 * TENTH_MV_PER_VOLT;
    let numerator = offset_tenth_mv * generation.dac_bit_max() as i64;
    let bits = (numerator + SPAN_TENTH_MV - 1) / SPAN_TENTH_MV;
    Ok(bits as u32)
}

/// Inverts [`volts_to_bits`], rounding to 2 decimal places to match the
/// precision the device itself displays. Used only by the readback path.
pub fn bits_to_volts(bits: u32, generation: HardwareGeneration) -> f64 {
    let volts = (bits as f64 / generation.dac_bit_max() as f64) * 20.0 + VOLTAGE_MIN;
    (volts * 100.0).round() / 100.0
}

/// Converts a non-negative duration in seconds to a u32 cycle count:
/// `round(s * 20000)`.
pub fn seconds_to_cycles(seconds: f64) -> Result<u32, ParameterError> {
    if !seconds.is_finite() || seconds < 0.0 {
        return Err(ParameterError::ValueOutOfDomain {
            what: "duration (s)",
            value: seconds,
        });
    }
    let cycles = (seconds * CYCLE_FREQUENCY_HZ as f64).round();
    if cycles > u32::MAX as f64 {
        return Err(ParameterError::DurationTooLong { seconds });
    }
    Ok(cycles as u32)
}

/// Inverts [`seconds_to_cycles`] without rounding.
pub fn cycles_to_seconds(cycles: u32) -> f64 {
    cycles as f64 / CYCLE_FREQUENCY_HZ as f64
}
