use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pulsepal_core::domain::train::{CustomTrain, TrainSlot};
use pulsepal_core::protocol::encode;
use pulsepal_core::{HardwareGeneration, ParameterStore};

fn bench_sync_all(c: &mut Criterion) {
    let store = ParameterStore::new();
    c.bench_function("sync_all_model2", |b| {
        b.iter(|| encode::sync_all(HardwareGeneration::Model2, black_box(&store)))
    });
    c.bench_function("sync_all_model1", |b| {
        b.iter(|| encode::sync_all(HardwareGeneration::Model1, black_box(&store)))
    });
}

fn bench_custom_train(c: &mut Criterion) {
    let times: Vec<f64> = (0..1000).map(|i| i as f64 * 0.001).collect();
    let volts: Vec<f64> = (0..1000).map(|i| (i % 20) as f64 - 10.0).collect();
    let train = CustomTrain::from_arrays(&times, &volts).unwrap();
    c.bench_function("custom_train_1000_pulses", |b| {
        b.iter(|| encode::custom_train(HardwareGeneration::Model2, TrainSlot::One, black_box(&train)))
    });
}

criterion_group!(benches, bench_sync_all, bench_custom_train);
criterion_main!(benches);
