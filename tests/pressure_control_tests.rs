//! Tests for pressure-control ventilation.
//!
//! Scenario reference: default patient (C = 0.05 L/cmH2O, R = 10 cmH2O·s/L),
//! pressure_target = 20, PEEP = 0, inspiratory_time = 0.8 s, rate = 10/min.
//! Breaths start every 60 / 10 = 6 s; airway pressure plateaus at the target
//! during inspiration and volume returns to ~0 by the end of each exhalation.

use vent_simulator::{
    Channel, Phase, PressureControlVentilator, PressureReference, RunMetrics, Setting,
    SettingValue, Settings, Ventilator,
};

fn scenario() -> PressureControlVentilator {
    let mut vent = PressureControlVentilator::default();
    vent.set(Setting::PressureTarget, SettingValue::Number(20.0)).unwrap();
    vent.set(Setting::Peep, SettingValue::Number(0.0)).unwrap();
    vent.set(Setting::InspiratoryTime, SettingValue::Number(0.8)).unwrap();
    vent.set(Setting::RespiratoryRate, SettingValue::Number(10.0)).unwrap();
    vent
}

#[test]
fn test_scenario_breath_timing() {
    let mut vent = scenario();
    vent.simulate(12.0, 0.02).unwrap();

    assert_eq!(vent.trace().len(), 601);
    let times = vent.data(Channel::Time);
    let starts = vent.trace().breath_starts();
    assert_eq!(starts.len(), 2);
    assert_eq!(times[starts[0]], 0.0);
    assert!((times[starts[1]] - 6.0).abs() < 0.1, "second breath at {}", times[starts[1]]);
}

#[test]
fn test_scenario_pressure_plateau() {
    let mut vent = scenario();
    vent.simulate(12.0, 0.02).unwrap();

    for sample in vent.trace().samples() {
        if sample.phase == Phase::Inspiratory {
            assert_eq!(sample.pressure_cmH2O, 20.0);
            assert!(sample.p_alv_cmH2O < 20.0);
        }
    }
    let metrics = RunMetrics::from_trace(vent.trace());
    assert_eq!(metrics.peak_pressure_cmH2O, 20.0);
    for breath in &metrics.breaths {
        // 0.82 s of inspiration at RC = 0.5 s fills ~80% toward the target
        assert!(breath.peak_p_alv_cmH2O > 15.0 && breath.peak_p_alv_cmH2O < 20.0);
    }
}

#[test]
fn test_scenario_volume_returns_to_baseline() {
    let mut vent = scenario();
    vent.simulate(12.0, 0.02).unwrap();

    let volume = vent.data(Channel::Volume);
    let starts = vent.trace().breath_starts();
    let end_of_first_expiration = volume[starts[1] - 1];
    let end_of_run = volume[volume.len() - 1];
    assert!(end_of_first_expiration.abs() < 1e-3);
    assert!(end_of_run.abs() < 1e-3);

    let peak_volume = volume.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    assert!(peak_volume > 0.75 && peak_volume < 1.0);
}

#[test]
fn test_zero_rate_prevents_further_breaths() {
    let mut vent = scenario();
    vent.set(Setting::RespiratoryRate, SettingValue::Number(0.0)).unwrap();
    vent.simulate(60.0, 0.02).unwrap();
    assert_eq!(vent.trace().breath_starts().len(), 1);
}

#[test]
fn test_disabling_rate_after_first_breath() {
    let mut vent = scenario();
    let mut seen = Vec::new();
    vent.run(60.0, 0.02, &mut |settings: &mut Settings, breath: usize| {
        seen.push(breath);
        if breath == 1 {
            settings.set(Setting::RespiratoryRate, 0.0).unwrap();
        }
    })
    .unwrap();

    assert_eq!(seen, vec![1]);
    let phases = vent.trace().phases();
    let entries = phases
        .windows(2)
        .filter(|w| w[0] != Phase::Inspiratory && w[1] == Phase::Inspiratory)
        .count();
    assert_eq!(entries, 1);
}

#[test]
fn test_disabling_rate_after_second_breath() {
    let mut vent = scenario();
    vent.run(60.0, 0.02, &mut |settings: &mut Settings, breath: usize| {
        if breath == 2 {
            settings.set(Setting::RespiratoryRate, 0.0).unwrap();
        }
    })
    .unwrap();
    assert_eq!(vent.trace().breath_starts().len(), 2);
}

#[test]
fn test_phase_sequence_with_pause() {
    let mut vent = scenario();
    vent.set(Setting::InspiratoryPause, SettingValue::Number(0.4)).unwrap();
    vent.simulate(12.0, 0.02).unwrap();

    let mut sequence: Vec<Phase> = Vec::new();
    for phase in vent.trace().phases().into_iter().skip(1) {
        if sequence.last() != Some(&phase) {
            sequence.push(phase);
        }
    }
    assert_eq!(
        sequence,
        vec![
            Phase::Inspiratory,
            Phase::InspiratoryPause,
            Phase::Expiratory,
            Phase::Inspiratory,
            Phase::InspiratoryPause,
            Phase::Expiratory,
        ]
    );
}

#[test]
fn test_pressure_reference_above_peep() {
    let mut vent = scenario().with_pressure_reference(PressureReference::AbovePeep);
    vent.set(Setting::Peep, SettingValue::Number(5.0)).unwrap();
    vent.set(Setting::InspiratoryTime, SettingValue::Number(3.0)).unwrap();
    vent.simulate(5.0, 0.02).unwrap();

    let samples = vent.trace().samples();
    assert_eq!(samples[0].p_alv_cmH2O, 5.0);
    assert_eq!(samples[1].pressure_cmH2O, 25.0);
    // Six time constants of inspiration: alveolar pressure reaches the target
    let peak = vent
        .data(Channel::AlveolarPressure)
        .into_iter()
        .fold(f64::NEG_INFINITY, f64::max);
    assert!((peak - 25.0).abs() < 0.1);
}

#[test]
fn test_pressure_reference_absolute_ignores_peep() {
    let mut vent = scenario();
    vent.set(Setting::Peep, SettingValue::Number(5.0)).unwrap();
    vent.simulate(2.0, 0.02).unwrap();
    assert_eq!(vent.data(Channel::Pressure)[1], 20.0);
    // Initial flow only sees the 15 cmH2O gradient above PEEP
    assert!((vent.data(Channel::Flow)[1] - 1.5).abs() < 1e-12);
}
