//! End-to-end session scenarios against the scripted mock transport.

use pulsepal_client::session::{PulsePal, SessionError};
use pulsepal_client::transport::mock::MockTransport;
use pulsepal_core::domain::params::{
    OutputChannel, OutputParam, ParamValue, TriggerChannel, TriggerMode,
};
use pulsepal_core::domain::train::{CustomTrain, TrainSlot};
use pulsepal_core::domain::units::HardwareGeneration;
use pulsepal_core::protocol::encode;
use pulsepal_core::ParameterStore;

fn model2(transport: &mut MockTransport) -> PulsePal<&mut MockTransport> {
    transport.queue_handshake(23);
    PulsePal::connect(transport).unwrap()
}

#[test]
fn full_model2_programming_scenario() {
    let mut transport = MockTransport::new();
    transport.queue_handshake(23);
    // The device acks the program command and the train upload.
    transport.queue(&[1, 1]);

    let mut pal = PulsePal::connect(&mut transport).unwrap();
    assert_eq!(pal.firmware_version(), 23);
    assert_eq!(pal.generation(), HardwareGeneration::Model2);

    // Program phase1Voltage = 10 V on channel 1.
    pal.set_parameter(
        OutputChannel::Ch1,
        OutputParam::Phase1Voltage,
        ParamValue::Volts(10.0),
    )
    .unwrap();
    assert_eq!(
        pal.params().channel(OutputChannel::Ch1).phase1_voltage,
        10.0
    );

    // Upload a custom train and trigger channel 1.
    let train = CustomTrain::from_arrays(&[0.0, 0.2, 0.5, 1.0], &[8.0, 4.0, -3.5, -10.0]).unwrap();
    pal.send_custom_train(TrainSlot::One, &train).unwrap();
    pal.trigger([true, false, false, false]).unwrap();

    pal.disconnect().unwrap();
    drop(pal);

    // writes: handshake, client name, program, train, trigger, terminate.
    assert_eq!(transport.writes.len(), 6);
    assert_eq!(transport.writes[2], vec![213, 74, 2, 1, 255, 255]);

    let train_frame = &transport.writes[3];
    assert_eq!(&train_frame[..2], &[213, 75]);
    let times: Vec<u32> = train_frame[6..22]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(times, [0, 4_000, 10_000, 20_000]);

    assert_eq!(transport.writes[4], vec![213, 77, 0b0001]);
    assert_eq!(transport.writes[5], vec![213, 81]);
}

#[test]
fn fixed_voltage_width_dispatches_on_generation() {
    let mut t2 = MockTransport::new();
    t2.queue_handshake(23);
    t2.queue_ack();
    let mut pal = PulsePal::connect(&mut t2).unwrap();
    pal.set_fixed_voltage(OutputChannel::Ch2, 0.0).unwrap();
    drop(pal);
    // Model 2: u16 DAC word, 0 V ceils to 32768.
    assert_eq!(t2.writes[2], vec![213, 79, 2, 0x00, 0x80]);

    let mut t1 = MockTransport::new();
    t1.queue_handshake(4);
    t1.queue_ack();
    let mut pal = PulsePal::connect(&mut t1).unwrap();
    pal.set_fixed_voltage(OutputChannel::Ch2, 0.0).unwrap();
    drop(pal);
    // Model 1: single byte, 0 V ceils to 128.
    assert_eq!(t1.writes[2], vec![213, 79, 2, 128]);
}

#[test]
fn sync_all_is_idempotent_and_store_scoped() {
    let mut transport = MockTransport::new();
    transport.queue_handshake(23);
    transport.queue(&[1, 1, 1]);
    let mut pal = PulsePal::connect(&mut transport).unwrap();

    pal.set_parameter(
        OutputChannel::Ch3,
        OutputParam::InterPulseInterval,
        ParamValue::Seconds(0.2),
    )
    .unwrap();
    pal.sync_all_params().unwrap();
    pal.sync_all_params().unwrap();
    drop(pal);

    let first = &transport.writes[3];
    let second = &transport.writes[4];
    assert_eq!(first, second);
    assert_eq!(first.len(), 180);

    // Channel isolation: only channel 3's interPulseInterval moved.
    let expected = {
        let mut store = ParameterStore::new();
        store
            .apply(
                OutputChannel::Ch3,
                OutputParam::InterPulseInterval,
                ParamValue::Seconds(0.2),
            )
            .unwrap();
        encode::sync_all(HardwareGeneration::Model2, &store).unwrap()
    };
    assert_eq!(*first, expected);
}

#[test]
fn unacknowledged_sync_reports_error() {
    let mut transport = MockTransport::new();
    let mut pal = model2(&mut transport);
    let err = pal.sync_all_params().unwrap_err();
    assert!(matches!(
        err,
        SessionError::Acknowledgement {
            operation: "sync all parameters"
        }
    ));
}

#[test]
fn set_defaults_restores_factory_store() {
    let mut transport = MockTransport::new();
    transport.queue_handshake(23);
    transport.queue(&[1, 1]);
    let mut pal = PulsePal::connect(&mut transport).unwrap();

    pal.set_parameter(
        OutputChannel::Ch1,
        OutputParam::Phase1Voltage,
        ParamValue::Volts(-2.5),
    )
    .unwrap();
    pal.set_default_params().unwrap();
    assert_eq!(*pal.params(), ParameterStore::new());
}

#[test]
fn trigger_mode_programs_offset_code_and_mirrors() {
    let mut transport = MockTransport::new();
    transport.queue_handshake(23);
    transport.queue_ack();
    let mut pal = PulsePal::connect(&mut transport).unwrap();
    pal.set_trigger_mode(TriggerChannel::Trig1, TriggerMode::Toggle)
        .unwrap();
    assert_eq!(
        pal.params().trigger(TriggerChannel::Trig1).trigger_mode,
        TriggerMode::Toggle
    );
    drop(pal);
    assert_eq!(transport.writes[2], vec![213, 74, 129, 1, 1]);
}

#[test]
fn load_settings_file_replaces_store_from_readback() {
    // Script the device: handshake, then the 178-byte settings frame for a
    // non-default store.
    let mut device_store = ParameterStore::new();
    device_store
        .apply(
            OutputChannel::Ch4,
            OutputParam::BurstDuration,
            ParamValue::Seconds(0.5),
        )
        .unwrap();
    device_store.apply_trigger(TriggerChannel::Trig2, TriggerMode::PulseGated);
    let readback = encode::sync_all(HardwareGeneration::Model2, &device_store).unwrap()[2..].to_vec();

    let mut transport = MockTransport::new();
    transport.queue_handshake(23);
    transport.queue(&readback);

    let mut pal = PulsePal::connect(&mut transport).unwrap();
    pal.load_settings_file("exp1").unwrap();
    assert_eq!(*pal.params(), device_store);
    drop(pal);

    assert_eq!(
        transport.writes[2],
        vec![213, 90, 2, 4, b'e', b'x', b'p', b'1']
    );
}

#[test]
fn model1_session_uses_narrow_wire_formats() {
    let mut transport = MockTransport::new();
    transport.queue_handshake(4);
    transport.queue(&[1, 1]);
    let mut pal = PulsePal::connect(&mut transport).unwrap();
    assert_eq!(pal.generation(), HardwareGeneration::Model1);

    pal.set_parameter(
        OutputChannel::Ch1,
        OutputParam::Phase1Voltage,
        ParamValue::Volts(10.0),
    )
    .unwrap();

    let train = CustomTrain::from_arrays(&[0.0, 0.1], &[1.0, -1.0]).unwrap();
    pal.send_custom_train(TrainSlot::Two, &train).unwrap();
    drop(pal);

    // Single-byte DAC value.
    assert_eq!(transport.writes[2], vec![213, 74, 2, 1, 255]);
    // Correction byte after the opcode.
    assert_eq!(&transport.writes[3][..3], &[213, 76, 0]);
}

#[test]
fn waveform_upload_spaces_samples_by_pulse_width() {
    let mut transport = MockTransport::new();
    transport.queue_handshake(23);
    transport.queue_ack();
    let mut pal = PulsePal::connect(&mut transport).unwrap();
    pal.send_custom_waveform(TrainSlot::One, 0.001, &[1.0, 2.0, 3.0])
        .unwrap();
    drop(pal);

    let frame = &transport.writes[2];
    let times: Vec<u32> = frame[6..18]
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(times, [0, 20, 40]);
}
