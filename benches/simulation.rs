//! Simulation benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use vent_simulator::{
    FlowPattern, PressureControlVentilator, PressureSupportVentilator, RunMetrics, Setting,
    Ventilator, VolumeControlVentilator,
};

fn bench_pressure_support(c: &mut Criterion) {
    let mut vent = PressureSupportVentilator::default();

    c.bench_function("pressure_support_60s", |b| {
        b.iter(|| vent.simulate(black_box(60.0), black_box(0.02)))
    });
}

fn bench_pressure_control(c: &mut Criterion) {
    let mut vent = PressureControlVentilator::default();

    c.bench_function("pressure_control_60s", |b| {
        b.iter(|| vent.simulate(black_box(60.0), black_box(0.02)))
    });
}

fn bench_volume_control_decelerating(c: &mut Criterion) {
    let mut vent = VolumeControlVentilator::default();
    vent.set(Setting::FlowPattern, FlowPattern::Decelerating.into())
        .expect("flow pattern setting");
    vent.set(Setting::RiseTime, 0.1.into()).expect("rise time setting");

    c.bench_function("volume_control_decelerating_60s", |b| {
        b.iter(|| vent.simulate(black_box(60.0), black_box(0.02)))
    });
}

fn bench_metrics(c: &mut Criterion) {
    let mut vent = PressureControlVentilator::default();
    vent.simulate(60.0, 0.02).expect("simulation run");

    c.bench_function("run_metrics_60s", |b| {
        b.iter(|| RunMetrics::from_trace(black_box(vent.trace())))
    });
}

criterion_group!(
    benches,
    bench_pressure_support,
    bench_pressure_control,
    bench_volume_control_decelerating,
    bench_metrics
);
criterion_main!(benches);
