//! The device session: handshake, acknowledgement discipline, and the
//! public command surface.
//!
//! A [`PulsePal`] owns its transport exclusively and is strictly
//! request/response. Every mutating command except trigger, abort, and
//! continuous-loop blocks for a single acknowledgement byte; the local
//! [`ParameterStore`] mirror is updated only after that byte arrives, so
//! a failed or unacknowledged write leaves the host's view of the device
//! untouched.
//!
//! The hardware generation is fixed at connect time from the firmware
//! version in the handshake response and never re-negotiated.

use std::io;

use thiserror::Error;
use tracing::{debug, info, warn};

use pulsepal_core::domain::params::{
    OutputChannel, OutputParam, ParamValue, ParameterStore, TriggerChannel, TriggerMode,
};
use pulsepal_core::domain::train::{CustomTrain, TrainSlot};
use pulsepal_core::domain::units::HardwareGeneration;
use pulsepal_core::protocol::opcode::{SdOp, ACK, FIRMWARE_WITH_GATED_TRIGGER_BUG, HANDSHAKE_ACK};
use pulsepal_core::protocol::{decode, encode};
use pulsepal_core::{ParameterError, ProtocolError};

use crate::transport::Transport;

/// Name announced to the device after a successful handshake; shown on
/// the OLED next to "Connected".
pub const CLIENT_NAME: &str = "RUST";

/// Errors surfaced by a device session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The handshake response byte was not the expected acknowledgement.
    #[error("handshake failed: device answered {response} instead of {HANDSHAKE_ACK}")]
    Handshake { response: u8 },

    /// A command that requires an acknowledgement did not receive one.
    #[error("device did not acknowledge {operation}")]
    Acknowledgement { operation: &'static str },

    /// An operation was attempted outside the `Ready` state.
    #[error("session is not connected")]
    NotConnected,

    /// The operation does not exist on this hardware generation.
    #[error("{operation} is not supported on Model 1 hardware")]
    Unsupported { operation: &'static str },

    /// The underlying byte stream failed (including read timeouts).
    #[error("transport error: {0}")]
    Transport(#[from] io::Error),

    #[error(transparent)]
    Parameter(#[from] ParameterError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Connecting,
    Ready,
    Disconnected,
}

/// A connected Pulse Pal device.
#[derive(Debug)]
pub struct PulsePal<T: Transport> {
    transport: T,
    state: SessionState,
    firmware_version: u32,
    generation: HardwareGeneration,
    params: ParameterStore,
}

impl<T: Transport> PulsePal<T> {
    /// Performs the handshake on `transport` and announces [`CLIENT_NAME`].
    pub fn connect(transport: T) -> Result<Self, SessionError> {
        Self::connect_with_name(transport, CLIENT_NAME)
    }

    /// Performs the handshake and announces `client_name` on the device
    /// display.
    ///
    /// # Errors
    ///
    /// [`SessionError::Handshake`] if the device answers with anything but
    /// the handshake acknowledgement byte; transport errors pass through.
    pub fn connect_with_name(mut transport: T, client_name: &str) -> Result<Self, SessionError> {
        transport.write_all(&encode::handshake())?;

        let mut response = [0u8; decode::HANDSHAKE_RESPONSE_LEN];
        transport.read_exact(&mut response)?;
        let firmware_version = decode::handshake_response(&response).map_err(|err| match err {
            ProtocolError::InvalidFieldValue { value, .. } => {
                SessionError::Handshake { response: value }
            }
            other => SessionError::Protocol(other),
        })?;

        let generation = HardwareGeneration::from_firmware_version(firmware_version);
        info!(firmware_version, ?generation, "connected to Pulse Pal");
        if firmware_version == FIRMWARE_WITH_GATED_TRIGGER_BUG {
            warn!(
                "firmware {firmware_version} mishandles Pulse Gated triggering with \
                 multiple trigger inputs; a firmware update fixes this"
            );
        }

        let mut session = Self {
            transport,
            state: SessionState::Connecting,
            firmware_version,
            generation,
            params: ParameterStore::new(),
        };
        session.transport.write_all(&encode::client_name(client_name)?)?;
        session.state = SessionState::Ready;
        Ok(session)
    }

    pub fn firmware_version(&self) -> u32 {
        self.firmware_version
    }

    pub fn generation(&self) -> HardwareGeneration {
        self.generation
    }

    /// The host-side mirror of the device's parameter state.
    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    fn ensure_ready(&self) -> Result<(), SessionError> {
        if self.state == SessionState::Ready {
            Ok(())
        } else {
            Err(SessionError::NotConnected)
        }
    }

    fn ensure_model2(&self, operation: &'static str) -> Result<(), SessionError> {
        match self.generation {
            HardwareGeneration::Model2 => Ok(()),
            HardwareGeneration::Model1 => Err(SessionError::Unsupported { operation }),
        }
    }

    /// Blocks for the single acknowledgement byte. Any byte other than the
    /// acknowledgement value is treated as a protocol violation, not just
    /// a timeout.
    fn await_ack(&mut self, operation: &'static str) -> Result<(), SessionError> {
        let mut byte = [0u8; 1];
        match self.transport.read_exact(&mut byte) {
            Ok(()) if byte[0] == ACK => Ok(()),
            Ok(()) => {
                warn!(operation, byte = byte[0], "unexpected acknowledgement byte");
                Err(SessionError::Acknowledgement { operation })
            }
            Err(err) => {
                warn!(operation, %err, "acknowledgement read failed");
                Err(SessionError::Acknowledgement { operation })
            }
        }
    }

    fn send_acked(&mut self, frame: &[u8], operation: &'static str) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.transport.write_all(frame)?;
        self.await_ack(operation)
    }

    // ── Parameter programming ─────────────────────────────────────────────────

    /// Programs one output-channel parameter and, once acknowledged,
    /// mirrors it in the local store.
    pub fn set_parameter(
        &mut self,
        channel: OutputChannel,
        param: OutputParam,
        value: ParamValue,
    ) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let frame = encode::program_output_param(self.generation, channel, param, value)?;
        self.transport.write_all(&frame)?;
        self.await_ack("program parameter")?;
        self.params.apply(channel, param, value)?;
        debug!(param = param.name(), channel = channel.number(), "parameter programmed");
        Ok(())
    }

    /// [`set_parameter`](Self::set_parameter) addressed by the documented
    /// camelCase parameter name.
    pub fn set_parameter_by_name(
        &mut self,
        channel: OutputChannel,
        name: &str,
        value: ParamValue,
    ) -> Result<(), SessionError> {
        let param = OutputParam::from_name(name)?;
        self.set_parameter(channel, param, value)
    }

    /// Programs a trigger channel's mode.
    pub fn set_trigger_mode(
        &mut self,
        channel: TriggerChannel,
        mode: TriggerMode,
    ) -> Result<(), SessionError> {
        let frame = encode::program_trigger_param(channel, mode);
        self.send_acked(&frame, "program trigger mode")?;
        self.params.apply_trigger(channel, mode);
        Ok(())
    }

    /// Pushes the entire local store to the device in one bulk frame.
    pub fn sync_all_params(&mut self) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let frame = encode::sync_all(self.generation, &self.params)?;
        self.transport.write_all(&frame)?;
        self.await_ack("sync all parameters")
    }

    /// Syncs a complete parameter set (for example one loaded from a
    /// protocol file) to the device, adopting it as the local mirror once
    /// acknowledged.
    pub fn apply_store(&mut self, store: ParameterStore) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let frame = encode::sync_all(self.generation, &store)?;
        self.transport.write_all(&frame)?;
        self.await_ack("sync all parameters")?;
        self.params.replace(store);
        Ok(())
    }

    /// Resets the local store to factory defaults and syncs the device to
    /// match.
    pub fn set_default_params(&mut self) -> Result<(), SessionError> {
        self.apply_store(ParameterStore::new())
    }

    // ── Custom trains ─────────────────────────────────────────────────────────

    /// Uploads a custom pulse train to one of the two device slots.
    pub fn send_custom_train(
        &mut self,
        slot: TrainSlot,
        train: &CustomTrain,
    ) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let frame = encode::custom_train(self.generation, slot, train)?;
        self.transport.write_all(&frame)?;
        self.await_ack("custom train upload")
    }

    /// Uploads a waveform as a custom train: one pulse per sample, spaced
    /// `pulse_width` seconds apart.
    pub fn send_custom_waveform(
        &mut self,
        slot: TrainSlot,
        pulse_width: f64,
        voltages: &[f64],
    ) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let frame = encode::custom_waveform(self.generation, slot, pulse_width, voltages)?;
        self.transport.write_all(&frame)?;
        self.await_ack("custom train upload")
    }

    // ── Playback control ──────────────────────────────────────────────────────

    /// Soft-triggers any subset of the output channels. Fire-and-forget.
    pub fn trigger(&mut self, channels: [bool; 4]) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.transport.write_all(&encode::trigger_channels(channels))?;
        Ok(())
    }

    /// Stops all playing pulse trains. Fire-and-forget.
    pub fn abort_pulse_trains(&mut self) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.transport.write_all(&encode::abort_pulse_trains())?;
        Ok(())
    }

    /// Starts or stops continuous-loop playback on one channel.
    /// Fire-and-forget.
    pub fn set_continuous_loop(
        &mut self,
        channel: OutputChannel,
        enabled: bool,
    ) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.transport
            .write_all(&encode::continuous_loop(channel, enabled))?;
        Ok(())
    }

    /// Drives one channel to a fixed DC voltage until further notice.
    pub fn set_fixed_voltage(
        &mut self,
        channel: OutputChannel,
        volts: f64,
    ) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let frame = encode::fixed_voltage(self.generation, channel, volts)?;
        self.transport.write_all(&frame)?;
        self.await_ack("set fixed voltage")
    }

    /// Writes two lines of text to the device OLED.
    pub fn set_display(&mut self, line1: &str, line2: &str) -> Result<(), SessionError> {
        self.ensure_ready()?;
        let frame = encode::set_display(line1, line2)?;
        self.transport.write_all(&frame)?;
        self.await_ack("set display")
    }

    // ── SD-card settings files (Model 2) ──────────────────────────────────────

    /// Saves the device's current parameters to a named file on its SD
    /// card.
    pub fn save_settings_file(&mut self, filename: &str) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.ensure_model2("settings file save")?;
        let frame = encode::sd_command(SdOp::Save, filename)?;
        self.transport.write_all(&frame)?;
        self.await_ack("settings file save")
    }

    /// Loads a named settings file on the device and reads the resulting
    /// parameter state back into the local store.
    ///
    /// The readback frame is itself the confirmation; there is no separate
    /// acknowledgement byte.
    pub fn load_settings_file(&mut self, filename: &str) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.ensure_model2("settings file load")?;
        let frame = encode::sd_command(SdOp::Load, filename)?;
        self.transport.write_all(&frame)?;

        let mut payload = [0u8; decode::SETTINGS_FRAME_LEN];
        self.transport.read_exact(&mut payload)?;
        let store = decode::settings(&payload)?;
        self.params.replace(store);
        info!(filename, "settings file loaded and mirrored");
        Ok(())
    }

    /// Deletes a named settings file from the device's SD card.
    pub fn delete_settings_file(&mut self, filename: &str) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.ensure_model2("settings file delete")?;
        let frame = encode::sd_command(SdOp::Delete, filename)?;
        self.transport.write_all(&frame)?;
        self.await_ack("settings file delete")
    }

    // ── Teardown ──────────────────────────────────────────────────────────────

    /// Ends the session: sends the terminate opcode (the device persists
    /// its last-synced parameters) and leaves the session disconnected.
    ///
    /// Dropping a still-connected session sends terminate as a fallback;
    /// calling `disconnect` first is preferred because transport errors are
    /// reported instead of swallowed.
    pub fn disconnect(&mut self) -> Result<(), SessionError> {
        self.ensure_ready()?;
        self.state = SessionState::Disconnected;
        self.transport.write_all(&encode::terminate())?;
        info!("session terminated");
        Ok(())
    }
}

impl<T: Transport> Drop for PulsePal<T> {
    fn drop(&mut self) {
        // Exactly one terminate per session: disconnect() already moved the
        // state off Ready if it ran.
        if self.state == SessionState::Ready {
            self.state = SessionState::Disconnected;
            if let Err(err) = self.transport.write_all(&encode::terminate()) {
                warn!(%err, "failed to send terminate during drop");
            }
        }
    }
}
