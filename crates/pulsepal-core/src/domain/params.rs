//! The canonical in-memory mirror of every programmable device parameter.
//!
//! The device exposes 17 programmable parameters per output channel and one
//! per trigger channel, addressed on the wire by a fixed 1-based ordinal
//! table. [`OutputParam`] is that table as a closed enum, so an unknown
//! name or code is a typed error instead of a runtime index lookup.
//!
//! [`ParameterStore`] holds the current canonical values. It never touches
//! the wire; the session mutates it through [`ParameterStore::apply`] only
//! after the device has acknowledged the corresponding command, which is
//! what keeps the local mirror and the hardware consistent.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::units::{MAX_DURATION_SECONDS, VOLTAGE_MAX, VOLTAGE_MIN};

/// Errors raised by the parameter model and unit conversions.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParameterError {
    /// A parameter name is not in the ordinal table.
    #[error("unknown parameter name: {0:?}")]
    UnknownParameter(String),

    /// A wire parameter code is not in the ordinal table.
    #[error("unknown parameter code: {0}")]
    UnknownCode(u8),

    /// A channel index is outside the valid 1-based range.
    #[error("channel {index} out of range (valid: 1..={max})")]
    InvalidChannel { index: u8, max: u8 },

    /// A voltage, duration, or selector value is outside its domain.
    #[error("{what} value {value} out of domain")]
    ValueOutOfDomain { what: &'static str, value: f64 },

    /// A duration exceeds the 2^32-cycle wire representation (≈ 59.65 h).
    #[error("duration {seconds} s exceeds the maximum representable duration")]
    DurationTooLong { seconds: f64 },

    /// Custom-train pulse times must be non-decreasing.
    #[error("custom train pulse {index} is earlier than its predecessor")]
    NonMonotonicTrain { index: usize },

    /// A custom train was given mismatched time and voltage arrays.
    #[error("custom train has {times} pulse times but {voltages} voltages")]
    TrainLengthMismatch { times: usize, voltages: usize },

    /// A custom train must contain at least one pulse.
    #[error("custom train contains no pulses")]
    EmptyTrain,

    /// The supplied [`ParamValue`] variant does not match the parameter's
    /// class (e.g. seconds passed for a voltage parameter).
    #[error("parameter {param} expects a {expected} value")]
    WrongValueKind {
        param: &'static str,
        expected: &'static str,
    },
}

// ── Channels ──────────────────────────────────────────────────────────────────

/// One of the four stimulus output channels, numbered 1–4 on the device
/// front panel. There is deliberately no representation of "channel 0".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OutputChannel {
    Ch1 = 1,
    Ch2 = 2,
    Ch3 = 3,
    Ch4 = 4,
}

impl OutputChannel {
    pub const ALL: [OutputChannel; 4] = [
        OutputChannel::Ch1,
        OutputChannel::Ch2,
        OutputChannel::Ch3,
        OutputChannel::Ch4,
    ];

    /// 1-based channel number as sent on the wire.
    pub fn number(self) -> u8 {
        self as u8
    }

    /// 0-based array index.
    pub(crate) fn index(self) -> usize {
        self as usize - 1
    }
}

impl TryFrom<u8> for OutputChannel {
    type Error = ParameterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(OutputChannel::Ch1),
            2 => Ok(OutputChannel::Ch2),
            3 => Ok(OutputChannel::Ch3),
            4 => Ok(OutputChannel::Ch4),
            _ => Err(ParameterError::InvalidChannel {
                index: value,
                max: 4,
            }),
        }
    }
}

/// One of the two TTL trigger input channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum TriggerChannel {
    Trig1 = 1,
    Trig2 = 2,
}

impl TriggerChannel {
    pub const ALL: [TriggerChannel; 2] = [TriggerChannel::Trig1, TriggerChannel::Trig2];

    /// 1-based channel number as sent on the wire.
    pub fn number(self) -> u8 {
        self as u8
    }

    pub(crate) fn index(self) -> usize {
        self as usize - 1
    }
}

impl TryFrom<u8> for TriggerChannel {
    type Error = ParameterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(TriggerChannel::Trig1),
            2 => Ok(TriggerChannel::Trig2),
            _ => Err(ParameterError::InvalidChannel {
                index: value,
                max: 2,
            }),
        }
    }
}

// ── Parameter ordinal table ───────────────────────────────────────────────────

/// The class of a parameter, which decides both its value domain and its
/// width on the wire (see the program-parameter opcode).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// Boolean flag; one byte on the wire.
    Flag,
    /// Voltage in [-10, 10] V; u8 (Model 1) or u16 (Model 2) DAC code.
    Voltage,
    /// Non-negative duration in seconds; u32 cycle count.
    Duration,
    /// Small integer selector with an inclusive upper bound; one byte.
    Selector { max: u8 },
}

/// Output-channel parameters by their fixed wire ordinal (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum OutputParam {
    IsBiphasic = 1,
    Phase1Voltage = 2,
    Phase2Voltage = 3,
    Phase1Duration = 4,
    InterPhaseInterval = 5,
    Phase2Duration = 6,
    InterPulseInterval = 7,
    BurstDuration = 8,
    InterBurstInterval = 9,
    PulseTrainDuration = 10,
    PulseTrainDelay = 11,
    LinkTriggerChannel1 = 12,
    LinkTriggerChannel2 = 13,
    CustomTrainId = 14,
    CustomTrainTarget = 15,
    CustomTrainLoop = 16,
    RestingVoltage = 17,
}

impl OutputParam {
    pub const ALL: [OutputParam; 17] = [
        OutputParam::IsBiphasic,
        OutputParam::Phase1Voltage,
        OutputParam::Phase2Voltage,
        OutputParam::Phase1Duration,
        OutputParam::InterPhaseInterval,
        OutputParam::Phase2Duration,
        OutputParam::InterPulseInterval,
        OutputParam::BurstDuration,
        OutputParam::InterBurstInterval,
        OutputParam::PulseTrainDuration,
        OutputParam::PulseTrainDelay,
        OutputParam::LinkTriggerChannel1,
        OutputParam::LinkTriggerChannel2,
        OutputParam::CustomTrainId,
        OutputParam::CustomTrainTarget,
        OutputParam::CustomTrainLoop,
        OutputParam::RestingVoltage,
    ];

    /// Wire parameter code (the 1-based ordinal).
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Result<Self, ParameterError> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.code() == code)
            .ok_or(ParameterError::UnknownCode(code))
    }

    /// Parameter name as documented for the device (camelCase, matching
    /// the vendor's client libraries).
    pub fn name(self) -> &'static str {
        match self {
            OutputParam::IsBiphasic => "isBiphasic",
            OutputParam::Phase1Voltage => "phase1Voltage",
            OutputParam::Phase2Voltage => "phase2Voltage",
            OutputParam::Phase1Duration => "phase1Duration",
            OutputParam::InterPhaseInterval => "interPhaseInterval",
            OutputParam::Phase2Duration => "phase2Duration",
            OutputParam::InterPulseInterval => "interPulseInterval",
            OutputParam::BurstDuration => "burstDuration",
            OutputParam::InterBurstInterval => "interBurstInterval",
            OutputParam::PulseTrainDuration => "pulseTrainDuration",
            OutputParam::PulseTrainDelay => "pulseTrainDelay",
            OutputParam::LinkTriggerChannel1 => "linkTriggerChannel1",
            OutputParam::LinkTriggerChannel2 => "linkTriggerChannel2",
            OutputParam::CustomTrainId => "customTrainID",
            OutputParam::CustomTrainTarget => "customTrainTarget",
            OutputParam::CustomTrainLoop => "customTrainLoop",
            OutputParam::RestingVoltage => "restingVoltage",
        }
    }

    pub fn from_name(name: &str) -> Result<Self, ParameterError> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.name() == name)
            .ok_or_else(|| ParameterError::UnknownParameter(name.to_string()))
    }

    pub fn kind(self) -> ParamKind {
        match self {
            OutputParam::IsBiphasic
            | OutputParam::LinkTriggerChannel1
            | OutputParam::LinkTriggerChannel2
            | OutputParam::CustomTrainLoop => ParamKind::Flag,
            OutputParam::Phase1Voltage
            | OutputParam::Phase2Voltage
            | OutputParam::RestingVoltage => ParamKind::Voltage,
            OutputParam::Phase1Duration
            | OutputParam::InterPhaseInterval
            | OutputParam::Phase2Duration
            | OutputParam::InterPulseInterval
            | OutputParam::BurstDuration
            | OutputParam::InterBurstInterval
            | OutputParam::PulseTrainDuration
            | OutputParam::PulseTrainDelay => ParamKind::Duration,
            OutputParam::CustomTrainId => ParamKind::Selector { max: 2 },
            OutputParam::CustomTrainTarget => ParamKind::Selector { max: 1 },
        }
    }
}

/// Trigger-channel parameter table. The wire code for a trigger parameter
/// is its ordinal plus 128, distinguishing it from output codes.
pub const TRIGGER_MODE_CODE: u8 = 1;

/// Reaction of an output channel to a TTL edge on a linked trigger line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum TriggerMode {
    /// Each trigger starts one pulse train; retriggers during playback are
    /// ignored.
    #[default]
    Normal = 0,
    /// Triggers alternately start and stop the train.
    Toggle = 1,
    /// The train plays only while the trigger line is held high.
    PulseGated = 2,
}

impl TryFrom<u8> for TriggerMode {
    type Error = ParameterError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TriggerMode::Normal),
            1 => Ok(TriggerMode::Toggle),
            2 => Ok(TriggerMode::PulseGated),
            _ => Err(ParameterError::ValueOutOfDomain {
                what: "trigger mode",
                value: value as f64,
            }),
        }
    }
}

// ── Parameter values ──────────────────────────────────────────────────────────

/// A dynamically classed parameter value, used by the generic
/// [`ParameterStore::apply`] / [`ParameterStore::value`] interface and the
/// single-parameter program command.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Flag(bool),
    Volts(f64),
    Seconds(f64),
    Selector(u8),
}

impl ParamValue {
    /// Checks this value against a parameter's class and domain.
    pub fn validate_for(self, param: OutputParam) -> Result<(), ParameterError> {
        match (param.kind(), self) {
            (ParamKind::Flag, ParamValue::Flag(_)) => Ok(()),
            (ParamKind::Voltage, ParamValue::Volts(v)) => {
                if v.is_finite() && (VOLTAGE_MIN..=VOLTAGE_MAX).contains(&v) {
                    Ok(())
                } else {
                    Err(ParameterError::ValueOutOfDomain {
                        what: "voltage (V)",
                        value: v,
                    })
                }
            }
            (ParamKind::Duration, ParamValue::Seconds(s)) => {
                if !s.is_finite() || s < 0.0 {
                    Err(ParameterError::ValueOutOfDomain {
                        what: "duration (s)",
                        value: s,
                    })
                } else if s > MAX_DURATION_SECONDS {
                    Err(ParameterError::DurationTooLong { seconds: s })
                } else {
                    Ok(())
                }
            }
            (ParamKind::Selector { max }, ParamValue::Selector(v)) => {
                if v <= max {
                    Ok(())
                } else {
                    Err(ParameterError::ValueOutOfDomain {
                        what: "selector",
                        value: v as f64,
                    })
                }
            }
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
}

// ── Per-channel state ─────────────────────────────────────────────────────────

/// All programmable parameters of one output channel.
///
/// Defaults match the vendor client libraries: a 1 ms biphasic-capable
/// pulse at ±5 V, 10 ms between pulses, a 1 s train, linked to trigger
/// channel 1.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelParameters {
    pub is_biphasic: bool,
    pub phase1_voltage: f64,
    pub phase2_voltage: f64,
    pub resting_voltage: f64,
    pub phase1_duration: f64,
    pub inter_phase_interval: f64,
    pub phase2_duration: f64,
    pub inter_pulse_interval: f64,
    pub burst_duration: f64,
    pub inter_burst_interval: f64,
    pub pulse_train_duration: f64,
    pub pulse_train_delay: f64,
    pub link_trigger_channel_1: bool,
    pub link_trigger_channel_2: bool,
    /// 0 = periodic parameters, 1 or 2 = play that custom train slot.
    pub custom_train_id: u8,
    /// 0 = train times are absolute, 1 = train entries are pulse indices.
    pub custom_train_target: u8,
    pub custom_train_loop: bool,
}

impl Default for ChannelParameters {
    fn default() -> Self {
        Self {
            is_biphasic: false,
            phase1_voltage: 5.0,
            phase2_voltage: -5.0,
            resting_voltage: 0.0,
            phase1_duration: 0.001,
            inter_phase_interval: 0.001,
            phase2_duration: 0.001,
            inter_pulse_interval: 0.01,
            burst_duration: 0.0,
            inter_burst_interval: 0.0,
            pulse_train_duration: 1.0,
            pulse_train_delay: 0.0,
            link_trigger_channel_1: true,
            link_trigger_channel_2: false,
            custom_train_id: 0,
            custom_train_target: 0,
            custom_train_loop: false,
        }
    }
}

/// All programmable parameters of one trigger channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TriggerParameters {
    pub trigger_mode: TriggerMode,
}

// ── The store ─────────────────────────────────────────────────────────────────

/// The canonical parameter state for all four output channels and both
/// trigger channels.
///
/// The store never performs I/O. The session calls [`apply`] only after a
/// command has been acknowledged, so a failed write leaves the store
/// exactly as it was.
///
/// [`apply`]: ParameterStore::apply
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ParameterStore {
    channels: [ChannelParameters; 4],
    triggers: [TriggerParameters; 2],
}

impl ParameterStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn channel(&self, channel: OutputChannel) -> &ChannelParameters {
        &self.channels[channel.index()]
    }

    pub fn trigger(&self, channel: TriggerChannel) -> &TriggerParameters {
        &self.triggers[channel.index()]
    }

    /// Reads one parameter as a dynamically classed value.
    pub fn value(&self, channel: OutputChannel, param: OutputParam) -> ParamValue {
        let ch = self.channel(channel);
        match param {
            OutputParam::IsBiphasic => ParamValue::Flag(ch.is_biphasic),
            OutputParam::Phase1Voltage => ParamValue::Volts(ch.phase1_voltage),
            OutputParam::Phase2Voltage => ParamValue::Volts(ch.phase2_voltage),
            OutputParam::RestingVoltage => ParamValue::Volts(ch.resting_voltage),
            OutputParam::Phase1Duration => ParamValue::Seconds(ch.phase1_duration),
            OutputParam::InterPhaseInterval => ParamValue::Seconds(ch.inter_phase_interval),
            OutputParam::Phase2Duration => ParamValue::Seconds(ch.phase2_duration),
            OutputParam::InterPulseInterval => ParamValue::Seconds(ch.inter_pulse_interval),
            OutputParam::BurstDuration => ParamValue::Seconds(ch.burst_duration),
            OutputParam::InterBurstInterval => ParamValue::Seconds(ch.inter_burst_interval),
            OutputParam::PulseTrainDuration => ParamValue::Seconds(ch.pulse_train_duration),
            OutputParam::PulseTrainDelay => ParamValue::Seconds(ch.pulse_train_delay),
            OutputParam::LinkTriggerChannel1 => ParamValue::Flag(ch.link_trigger_channel_1),
            OutputParam::LinkTriggerChannel2 => ParamValue::Flag(ch.link_trigger_channel_2),
            OutputParam::CustomTrainId => ParamValue::Selector(ch.custom_train_id),
            OutputParam::CustomTrainTarget => ParamValue::Selector(ch.custom_train_target),
            OutputParam::CustomTrainLoop => ParamValue::Flag(ch.custom_train_loop),
        }
    }

    /// Validates and stores one parameter value.
    ///
    /// # Errors
    ///
    /// Returns [`ParameterError`] if the value's class or domain does not
    /// match the parameter; the store is unchanged in that case.
    pub fn apply(
        &mut self,
        channel: OutputChannel,
        param: OutputParam,
        value: ParamValue,
    ) -> Result<(), ParameterError> {
        value.validate_for(param)?;
        let ch = &mut self.channels[channel.index()];
        match (param, value) {
            (OutputParam::IsBiphasic, ParamValue::Flag(v)) => ch.is_biphasic = v,
            (OutputParam::Phase1Voltage, ParamValue::Volts(v)) => ch.phase1_voltage = v,
            (OutputParam::Phase2Voltage, ParamValue::Volts(v)) => ch.phase2_voltage = v,
            (OutputParam::RestingVoltage, ParamValue::Volts(v)) => ch.resting_voltage = v,
            (OutputParam::Phase1Duration, ParamValue::Seconds(v)) => ch.phase1_duration = v,
            (OutputParam::InterPhaseInterval, ParamValue::Seconds(v)) => {
                ch.inter_phase_interval = v
            }
            (OutputParam::Phase2Duration, ParamValue::Seconds(v)) => ch.phase2_duration = v,
            (OutputParam::InterPulseInterval, ParamValue::Seconds(v)) => {
                ch.inter_pulse_interval = v
            }
            (OutputParam::BurstDuration, ParamValue::Seconds(v)) => ch.burst_duration = v,
            (OutputParam::InterBurstInterval, ParamValue::Seconds(v)) => {
                ch.inter_burst_interval = v
            }
            (OutputParam::PulseTrainDuration, ParamValue::Seconds(v)) => {
                ch.pulse_train_duration = v
            }
            (OutputParam::PulseTrainDelay, ParamValue::Seconds(v)) => ch.pulse_train_delay = v,
            (OutputParam::LinkTriggerChannel1, ParamValue::Flag(v)) => {
                ch.link_trigger_channel_1 = v
            }
            (OutputParam::LinkTriggerChannel2, ParamValue::Flag(v)) => {
                ch.link_trigger_channel_2 = v
            }
            (OutputParam::CustomTrainId, ParamValue::Selector(v)) => ch.custom_train_id = v,
            (OutputParam::CustomTrainTarget, ParamValue::Selector(v)) => {
                ch.custom_train_target = v
            }
            (OutputParam::CustomTrainLoop, ParamValue::Flag(v)) => ch.custom_train_loop = v,
            // validate_for already rejected any class mismatch.
            _ => unreachable!("validate_for admits only matching classes"),
        }
        Ok(())
    }

    /// Stores a trigger channel's mode. Infallible: the typed arguments
    /// already constrain channel and mode.
    pub fn apply_trigger(&mut self, channel: TriggerChannel, mode: TriggerMode) {
        self.triggers[channel.index()].trigger_mode = mode;
    }

    /// Replaces the entire store, used after a full settings readback.
    pub fn replace(&mut self, other: ParameterStore) {
        *self = other;
    }

    /// Builds a store directly from decoded per-channel state.
    pub fn from_parts(
        channels: [ChannelParameters; 4],
        triggers: [TriggerParameters; 2],
    ) -> Self {
        Self { channels, triggers }
    }
}
