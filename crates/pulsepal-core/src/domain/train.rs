//! Custom pulse trains: explicit (time, voltage) sequences that replace the
//! periodic pulse model when a channel's `customTrainID` selects them.

use serde::{Deserialize, Serialize};

use super::params::ParameterError;
use super::units::{MAX_DURATION_SECONDS, VOLTAGE_MAX, VOLTAGE_MIN};

/// One of the device's two custom-train memory slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TrainSlot {
    One = 1,
    Two = 2,
}

impl TrainSlot {
    /// 1-based slot number, as stored in a channel's `customTrainID`.
    pub fn number(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for TrainSlot {
    type Error = ParameterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TrainSlot::One),
            2 => Ok(TrainSlot::Two),
            _ => Err(ParameterError::ValueOutOfDomain {
                what: "custom train slot",
                value: value as f64,
            }),
        }
    }
}

/// A single pulse of a custom train.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pulse {
    /// Onset time in seconds from train start.
    pub time: f64,
    /// Output voltage in volts.
    pub voltage: f64,
}

/// A validated custom pulse train: at least one pulse, non-decreasing
/// onset times, every time and voltage inside the wire-representable
/// domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTrain {
    pulses: Vec<Pulse>,
}

impl CustomTrain {
    /// Validates and wraps a pulse sequence.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError`] for an empty train, a time or voltage
    /// outside its domain, or times that go backwards.
    pub fn new(pulses: Vec<Pulse>) -> Result<Self, ParameterError> {
        if pulses.is_empty() {
            return Err(ParameterError::EmptyTrain);
        }
        let mut previous = 0.0_f64;
        for (index, pulse) in pulses.iter().enumerate() {
            if !pulse.time.is_finite() || pulse.time < 0.0 {
                return Err(ParameterError::ValueOutOfDomain {
                    what: "pulse time (s)",
                    value: pulse.time,
                });
            }
            if pulse.time > MAX_DURATION_SECONDS {
                return Err(ParameterError::DurationTooLong {
                    seconds: pulse.time,
                });
            }
            if pulse.time < previous {
                return Err(ParameterError::NonMonotonicTrain { index });
            }
            if !pulse.voltage.is_finite()
                || !(VOLTAGE_MIN..=VOLTAGE_MAX).contains(&pulse.voltage)
            {
                return Err(ParameterError::ValueOutOfDomain {
                    what: "pulse voltage (V)",
                    value: pulse.voltage,
                });
            }
            previous = pulse.time;
        }
        Ok(Self { pulses })
    }

    /// Convenience constructor from parallel time/voltage arrays.
    pub fn from_arrays(times: &[f64], voltages: &[f64]) -> Result<Self, ParameterError> {
        if times.len() != voltages.len() {
            return Err(ParameterError::TrainLengthMismatch {
                times: times.len(),
                voltages: voltages.len(),
            });
        }
        Self::new(
            times
                .iter()
                .zip(voltages)
                .map(|(&time, &voltage)| Pulse { time, voltage })
                .collect(),
        )
    }

    pub fn pulses(&self) -> &[Pulse] {
        &self.pulses
    }

    pub fn len(&self) -> usize {
        self.pulses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pulses.is_empty()
    }
}
