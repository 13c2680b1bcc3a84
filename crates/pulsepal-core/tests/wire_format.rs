//! Golden-byte checks of the wire format against the device's documented
//! serial menu, independent of the encoder's internal helpers.

use pulsepal_core::domain::params::{OutputChannel, ParamValue, TriggerChannel, TriggerMode};
use pulsepal_core::domain::train::{CustomTrain, TrainSlot};
use pulsepal_core::protocol::opcode::SdOp;
use pulsepal_core::protocol::{decode, encode};
use pulsepal_core::{HardwareGeneration, OutputParam, ParameterStore};

#[test]
fn program_param_frame_matches_documented_example() {
    // phase1Voltage = 10 V on channel 1, Model 2: code 2, channel 1,
    // DAC word 0xFFFF.
    let frame = encode::program_output_param(
        HardwareGeneration::Model2,
        OutputChannel::Ch1,
        OutputParam::Phase1Voltage,
        ParamValue::Volts(10.0),
    )
    .unwrap();
    assert_eq!(frame, [213, 74, 2, 1, 255, 255]);
}

#[test]
fn custom_train_times_are_cycle_counts() {
    let train = CustomTrain::from_arrays(&[0.0, 0.2, 0.5, 1.0], &[8.0, 4.0, -3.5, -10.0]).unwrap();
    let frame = encode::custom_train(HardwareGeneration::Model2, TrainSlot::One, &train).unwrap();

    let words: Vec<u32> = frame[6..22]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(words, [0, 4_000, 10_000, 20_000]);

    let volts: Vec<u16> = frame[22..30]
        .chunks_exact(2)
        .map(|c| u16::from_le_bytes([c[0], c[1]]))
        .collect();
    assert_eq!(volts, [58_982, 45_875, 21_299, 0]);
}

#[test]
fn sync_frames_have_generation_specific_lengths() {
    let store = ParameterStore::new();
    let m1 = encode::sync_all(HardwareGeneration::Model1, &store).unwrap();
    let m2 = encode::sync_all(HardwareGeneration::Model2, &store).unwrap();
    assert_eq!(m1.len(), 168);
    assert_eq!(m2.len(), 180);
    assert_eq!(&m1[..2], &[213, 73]);
    assert_eq!(&m2[..2], &[213, 73]);
}

#[test]
fn settings_readback_inverts_sync_payload() {
    let mut store = ParameterStore::new();
    store
        .apply(
            OutputChannel::Ch1,
            OutputParam::Phase1Voltage,
            ParamValue::Volts(10.0),
        )
        .unwrap();
    store
        .apply(
            OutputChannel::Ch4,
            OutputParam::InterPulseInterval,
            ParamValue::Seconds(0.2),
        )
        .unwrap();
    store.apply_trigger(TriggerChannel::Trig1, TriggerMode::PulseGated);

    let sync = encode::sync_all(HardwareGeneration::Model2, &store).unwrap();
    let decoded = decode::settings(&sync[2..]).unwrap();
    assert_eq!(decoded, store);
}

#[test]
fn sd_and_control_frames() {
    assert_eq!(
        encode::sd_command(SdOp::Save, "set1").unwrap(),
        [213, 90, 1, 4, b's', b'e', b't', b'1']
    );
    assert_eq!(encode::abort_pulse_trains(), [213, 80]);
    assert_eq!(encode::terminate(), [213, 81]);
    assert_eq!(encode::handshake(), [213, 72]);
    assert_eq!(
        encode::trigger_channels([false, true, true, false]),
        [213, 77, 0b0110]
    );
}
