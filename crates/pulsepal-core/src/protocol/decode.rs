//! Parsers for the two payloads the device sends back: the handshake
//! response and the Model 2 settings readback.

use crate::domain::params::{ChannelParameters, ParameterStore, TriggerMode, TriggerParameters};
use crate::domain::units::{bits_to_volts, cycles_to_seconds, HardwareGeneration};
use crate::protocol::opcode::HANDSHAKE_ACK;
use crate::protocol::ProtocolError;

/// Length of a Model 2 settings readback: 32 u32 time fields, 12 u16
/// voltage fields, 16 flag bytes, 8 trigger-link bytes, 2 trigger modes.
pub const SETTINGS_FRAME_LEN: usize = 32 * 4 + 12 * 2 + 16 + 8 + 2;

/// Length of the handshake response: the acknowledgement byte followed by
/// the firmware version as a little-endian u32.
pub const HANDSHAKE_RESPONSE_LEN: usize = 5;

/// Parses a handshake response into the firmware version.
pub fn handshake_response(frame: &[u8]) -> Result<u32, ProtocolError> {
    if frame.len() != HANDSHAKE_RESPONSE_LEN {
        return Err(ProtocolError::UnexpectedLength {
            expected: HANDSHAKE_RESPONSE_LEN,
            got: frame.len(),
        });
    }
    if frame[0] != HANDSHAKE_ACK {
        return Err(ProtocolError::InvalidFieldValue {
            field: "handshake response byte",
            value: frame[0],
        });
    }
    Ok(u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]))
}

/// Cursor over a settings frame. Length is validated up front, so the
/// take methods index without further checks.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> u8 {
        let v = self.bytes[self.pos];
        self.pos += 1;
        v
    }

    fn u16(&mut self) -> u16 {
        let v = u16::from_le_bytes([self.bytes[self.pos], self.bytes[self.pos + 1]]);
        self.pos += 2;
        v
    }

    fn u32(&mut self) -> u32 {
        let v = u32::from_le_bytes([
            self.bytes[self.pos],
            self.bytes[self.pos + 1],
            self.bytes[self.pos + 2],
            self.bytes[self.pos + 3],
        ]);
        self.pos += 4;
        v
    }

    fn flag(&mut self, field: &'static str) -> Result<bool, ProtocolError> {
        match self.u8() {
            0 => Ok(false),
            1 => Ok(true),
            value => Err(ProtocolError::InvalidFieldValue { field, value }),
        }
    }

    fn bounded(&mut self, field: &'static str, max: u8) -> Result<u8, ProtocolError> {
        let value = self.u8();
        if value <= max {
            Ok(value)
        } else {
            Err(ProtocolError::InvalidFieldValue { field, value })
        }
    }
}

/// Decodes a Model 2 settings readback into a full [`ParameterStore`].
///
/// The frame mirrors the sync-all layout without the marker and opcode:
/// channel-major time fields, channel-major voltage words, then the
/// field-major flag block, trigger links, and trigger modes.
pub fn settings(frame: &[u8]) -> Result<ParameterStore, ProtocolError> {
    if frame.len() != SETTINGS_FRAME_LEN {
        return Err(ProtocolError::UnexpectedLength {
            expected: SETTINGS_FRAME_LEN,
            got: frame.len(),
        });
    }
    let mut r = Reader {
        bytes: frame,
        pos: 0,
    };
    let mut channels: [ChannelParameters; 4] = Default::default();

    for ch in &mut channels {
        ch.phase1_duration = cycles_to_seconds(r.u32());
        ch.inter_phase_interval = cycles_to_seconds(r.u32());
        ch.phase2_duration = cycles_to_seconds(r.u32());
        ch.inter_pulse_interval = cycles_to_seconds(r.u32());
        ch.burst_duration = cycles_to_seconds(r.u32());
        ch.inter_burst_interval = cycles_to_seconds(r.u32());
        ch.pulse_train_duration = cycles_to_seconds(r.u32());
        ch.pulse_train_delay = cycles_to_seconds(r.u32());
    }

    for ch in &mut channels {
        ch.phase1_voltage = bits_to_volts(r.u16() as u32, HardwareGeneration::Model2);
        ch.phase2_voltage = bits_to_volts(r.u16() as u32, HardwareGeneration::Model2);
        ch.resting_voltage = bits_to_volts(r.u16() as u32, HardwareGeneration::Model2);
    }

    for ch in &mut channels {
        ch.is_biphasic = r.flag("isBiphasic")?;
    }
    for ch in &mut channels {
        ch.custom_train_id = r.bounded("customTrainID", 2)?;
    }
    for ch in &mut channels {
        ch.custom_train_target = r.bounded("customTrainTarget", 1)?;
    }
    for ch in &mut channels {
        ch.custom_train_loop = r.flag("customTrainLoop")?;
    }

    for ch in &mut channels {
        ch.link_trigger_channel_1 = r.flag("linkTriggerChannel1")?;
    }
    for ch in &mut channels {
        ch.link_trigger_channel_2 = r.flag("linkTriggerChannel2")?;
    }

    let mut triggers: [TriggerParameters; 2] = Default::default();
    for trig in &mut triggers {
        let value = r.u8();
        trig.trigger_mode = TriggerMode::try_from(value).map_err(|_| {
            ProtocolError::InvalidFieldValue {
                field: "triggerMode",
                value,
            }
        })?;
    }

    Ok(ParameterStore::from_parts(channels, triggers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::params::{OutputChannel, TriggerChannel};
    use crate::protocol::encode;

    #[test]
    fn test_handshake_response_extracts_firmware() {
        assert_eq!(handshake_response(&[75, 23, 0, 0, 0]), Ok(23));
        assert_eq!(handshake_response(&[75, 0, 1, 0, 0]), Ok(256));
    }

    #[test]
    fn test_handshake_response_rejects_bad_ack_and_length() {
        assert_eq!(
            handshake_response(&[74, 23, 0, 0, 0]),
            Err(ProtocolError::InvalidFieldValue {
                field: "handshake response byte",
                value: 74
            })
        );
        assert_eq!(
            handshake_response(&[75, 23]),
            Err(ProtocolError::UnexpectedLength {
                expected: 5,
                got: 2
            })
        );
    }

    /// A readback frame is the Model 2 sync-all payload without the
    /// two-byte header, so the encoder doubles as a fixture generator.
    fn readback_of(store: &ParameterStore) -> Vec<u8> {
        encode::sync_all(HardwareGeneration::Model2, store).unwrap()[2..].to_vec()
    }

    #[test]
    fn test_settings_frame_length_is_validated() {
        assert_eq!(
            settings(&[0u8; 100]),
            Err(ProtocolError::UnexpectedLength {
                expected: SETTINGS_FRAME_LEN,
                got: 100
            })
        );
    }

    #[test]
    fn test_settings_decodes_default_store() {
        let store = ParameterStore::new();
        let decoded = settings(&readback_of(&store)).unwrap();
        // Voltages round-trip through the DAC with 0.01 V display
        // precision, which the defaults hit exactly.
        assert_eq!(decoded, store);
    }

    #[test]
    fn test_settings_recovers_programmed_values() {
        use crate::domain::params::{OutputParam, ParamValue};
        let mut store = ParameterStore::new();
        store
            .apply(
                OutputChannel::Ch3,
                OutputParam::PulseTrainDuration,
                ParamValue::Seconds(2.5),
            )
            .unwrap();
        store
            .apply(
                OutputChannel::Ch3,
                OutputParam::IsBiphasic,
                ParamValue::Flag(true),
            )
            .unwrap();
        store
            .apply(
                OutputChannel::Ch2,
                OutputParam::CustomTrainId,
                ParamValue::Selector(2),
            )
            .unwrap();
        store.apply_trigger(TriggerChannel::Trig2, TriggerMode::Toggle);

        let decoded = settings(&readback_of(&store)).unwrap();
        assert_eq!(decoded.channel(OutputChannel::Ch3).pulse_train_duration, 2.5);
        assert!(decoded.channel(OutputChannel::Ch3).is_biphasic);
        assert_eq!(decoded.channel(OutputChannel::Ch2).custom_train_id, 2);
        assert_eq!(
            decoded.trigger(TriggerChannel::Trig2).trigger_mode,
            TriggerMode::Toggle
        );
    }

    #[test]
    fn test_settings_rejects_invalid_flag_and_selector_bytes() {
        let base = readback_of(&ParameterStore::new());

        // First biphasic byte sits right after 128 time + 24 voltage bytes.
        let mut bad_flag = base.clone();
        bad_flag[152] = 7;
        assert_eq!(
            settings(&bad_flag),
            Err(ProtocolError::InvalidFieldValue {
                field: "isBiphasic",
                value: 7
            })
        );

        let mut bad_id = base.clone();
        bad_id[156] = 3;
        assert_eq!(
            settings(&bad_id),
            Err(ProtocolError::InvalidFieldValue {
                field: "customTrainID",
                value: 3
            })
        );

        let mut bad_mode = base;
        bad_mode[SETTINGS_FRAME_LEN - 1] = 9;
        assert_eq!(
            settings(&bad_mode),
            Err(ProtocolError::InvalidFieldValue {
                field: "triggerMode",
                value: 9
            })
        );
    }
}
