//! Breath-delivery modes driving the patient lung model.
//!
//! This module implements:
//! - Pressure support (flow-cycled, pressure-targeted)
//! - Pressure control (time-cycled, pressure-targeted)
//! - Volume control (volume-cycled, flow-targeted)
//!
//! Every mode is a state machine over inspiratory, inspiratory pause and
//! expiratory phases, stepped at a fixed time step. Each step integrates the
//! phase's flow into the patient volume, evaluates the phase transition,
//! then records the step. Transitions are evaluated after the volume update,
//! so each recorded sample reflects the phase that was active while it was
//! integrated.
//!
//! Expiration is passive toward PEEP in every mode:
//! Q = -(P_alv - PEEP) / R
//!
//! A new breath starts once the time since the previous breath start
//! exceeds 60 / respiratory_rate. A respiratory rate of zero disables
//! rate-triggered breaths entirely.

pub mod pressure_control;
pub mod pressure_support;
pub mod volume_control;

pub use pressure_control::{PressureControlVentilator, PressureReference};
pub use pressure_support::PressureSupportVentilator;
pub use volume_control::{FlowProfile, VolumeControlVentilator};

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VentError};
use crate::settings::{Setting, SettingValue, Settings};
use crate::state::{planned_steps, Channel, Patient, Phase, Trace};

/// Volume tolerance for volume-cycled inspiration (L)
pub const CLOSE_ENOUGH: f64 = 0.001;

/// Callback run at the start of every breath with the 1-based breath number.
///
/// Settings written here take effect for the breath that is starting.
pub type BreathHook<'a> = &'a mut dyn FnMut(&mut Settings, usize);

/// Breath-delivery mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    PressureSupport,
    #[default]
    PressureControl,
    VolumeControl,
}

impl Mode {
    pub fn name(&self) -> &'static str {
        match self {
            Mode::PressureSupport => "pressure_support",
            Mode::PressureControl => "pressure_control",
            Mode::VolumeControl => "volume_control",
        }
    }

    /// Build a ventilator of this mode bound to `patient`
    pub fn create(self, patient: Patient) -> Box<dyn Ventilator> {
        match self {
            Mode::PressureSupport => Box::new(PressureSupportVentilator::new(patient)),
            Mode::PressureControl => Box::new(PressureControlVentilator::new(patient)),
            Mode::VolumeControl => Box::new(VolumeControlVentilator::new(patient)),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, String> {
        match s {
            "ps" | "pressure_support" => Ok(Mode::PressureSupport),
            "pc" | "pressure_control" => Ok(Mode::PressureControl),
            "vc" | "volume_control" => Ok(Mode::VolumeControl),
            other => Err(format!("unknown mode '{}' (expected ps, pc or vc)", other)),
        }
    }
}

/// State shared by every mode: settings, the bound patient and the trace
#[derive(Debug, Clone)]
pub struct VentilatorCore {
    pub settings: Settings,
    pub patient: Patient,
    trace: Trace,
}

impl VentilatorCore {
    pub fn new(
        mode_name: &'static str,
        mode_defaults: &'static [(Setting, SettingValue)],
        patient: Patient,
    ) -> Self {
        Self {
            settings: Settings::new(mode_name, mode_defaults),
            patient,
            trace: Trace::default(),
        }
    }

    /// Validate the run, reallocate the trace, seed the resting volume and
    /// record the initial sample at PEEP. Returns the number of steps to run.
    pub fn begin_run(&mut self, time_length: f64, time_step: f64) -> Result<usize> {
        let timing_ok = time_step.is_finite()
            && time_step > 0.0
            && time_length.is_finite()
            && time_length >= 0.0;
        if !timing_ok {
            return Err(VentError::InvalidTiming {
                time_length,
                time_step,
            });
        }
        self.patient.validate()?;

        let steps = planned_steps(time_length, time_step);
        self.trace = Trace::with_capacity(steps + 1);

        let peep = self.settings.number(Setting::Peep)?;
        self.patient.set_peep_hint(peep);
        self.trace.seed(peep)?;

        log::info!(
            "{}: simulating {:.2} s at dt={} s ({} steps), C={} L/cmH2O, R={} cmH2O·s/L",
            self.settings.mode_name(),
            time_length,
            time_step,
            steps,
            self.patient.compliance_L_per_cmH2O,
            self.patient.resistance_cmH2O_s_per_L
        );
        Ok(steps)
    }

    pub(crate) fn finish_run(&self, breaths: usize) {
        log::info!(
            "{}: run complete, {} samples, {} breaths",
            self.settings.mode_name(),
            self.trace.len(),
            breaths
        );
    }

    /// Open the sample for the step starting at `time_sec`
    pub fn tick(&mut self, time_sec: f64, phase: Phase) -> Result<()> {
        self.trace.tick(time_sec, phase)
    }

    /// Merge values into the current sample
    pub fn record(&mut self, values: &[(Channel, f64)]) {
        self.trace.record(values);
    }

    pub fn trace(&self) -> &Trace {
        &self.trace
    }

    /// Passive exhalation toward PEEP for one step
    pub(crate) fn exhale(&mut self, time_step: f64, current_volume: &mut f64) -> Result<()> {
        let peep = self.settings.number(Setting::Peep)?;
        let flow = -(self.patient.pressure_cmH2O() - peep) / self.patient.resistance_cmH2O_s_per_L;
        let delta_volume = flow * time_step;
        self.patient.add_volume(delta_volume);
        *current_volume += delta_volume;

        let p_alv = self.patient.pressure_cmH2O();
        self.record(&[
            (Channel::Flow, flow),
            (Channel::Volume, *current_volume),
            (Channel::Pressure, peep),
            (Channel::AlveolarPressure, p_alv),
        ]);
        Ok(())
    }

    /// Static hold: no flow, airway pressure equals alveolar pressure
    pub(crate) fn hold(&mut self, current_volume: f64) {
        let p_alv = self.patient.pressure_cmH2O();
        self.record(&[
            (Channel::Flow, 0.0),
            (Channel::Volume, current_volume),
            (Channel::Pressure, p_alv),
            (Channel::AlveolarPressure, p_alv),
        ]);
    }

    /// Phase entered when inspiration cycles off
    pub(crate) fn phase_after_inspiration(&self) -> Result<Phase> {
        if self.settings.number(Setting::InspiratoryPause)? > 0.0 {
            Ok(Phase::InspiratoryPause)
        } else {
            Ok(Phase::Expiratory)
        }
    }

    /// Whether the backup rate calls for a new breath
    pub(crate) fn breath_due(&self, current_time: f64, last_breath_start: f64) -> Result<bool> {
        let rate = self.settings.number(Setting::RespiratoryRate)?;
        Ok(rate > 0.0 && (current_time - last_breath_start) > 60.0 / rate)
    }
}

/// Common interface of every breath-delivery mode
pub trait Ventilator {
    fn mode(&self) -> Mode;

    fn core(&self) -> &VentilatorCore;

    fn core_mut(&mut self) -> &mut VentilatorCore;

    /// Run the mode's state machine for `time_length` seconds, calling
    /// `on_breath` at the start of every breath.
    fn run(&mut self, time_length: f64, time_step: f64, on_breath: BreathHook<'_>) -> Result<()>;

    /// Run for `time_length` seconds at a fixed `time_step`
    fn simulate(&mut self, time_length: f64, time_step: f64) -> Result<()> {
        self.run(time_length, time_step, &mut |_, _| {})
    }

    /// Resolve a setting through override, mode and global tiers
    fn get(&self, key: Setting) -> Result<SettingValue> {
        self.core().settings.get(key)
    }

    fn number(&self, key: Setting) -> Result<f64> {
        self.core().settings.number(key)
    }

    /// Write a run-specific override
    fn set(&mut self, key: Setting, value: SettingValue) -> Result<()> {
        self.core_mut().settings.set(key, value)
    }

    fn settings(&self) -> &Settings {
        &self.core().settings
    }

    fn settings_mut(&mut self) -> &mut Settings {
        &mut self.core_mut().settings
    }

    fn patient(&self) -> &Patient {
        &self.core().patient
    }

    fn patient_mut(&mut self) -> &mut Patient {
        &mut self.core_mut().patient
    }

    /// Trace of the most recent run
    fn trace(&self) -> &Trace {
        self.core().trace()
    }

    /// One channel of the most recent run, oldest first
    fn data(&self, channel: Channel) -> Vec<f64> {
        self.core().trace().data(channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_parsing() {
        assert_eq!("ps".parse::<Mode>().unwrap(), Mode::PressureSupport);
        assert_eq!("pressure_control".parse::<Mode>().unwrap(), Mode::PressureControl);
        assert_eq!("vc".parse::<Mode>().unwrap(), Mode::VolumeControl);
        assert!("cpap".parse::<Mode>().is_err());
    }

    #[test]
    fn test_create_binds_mode_defaults() {
        let vent = Mode::VolumeControl.create(Patient::default());
        assert_eq!(vent.mode(), Mode::VolumeControl);
        assert_eq!(vent.number(Setting::VolumeTarget).unwrap(), 0.5);
        assert!(vent.number(Setting::FlowTrigger).is_err());
    }

    #[test]
    fn test_invalid_timing_rejected() {
        let mut vent = Mode::PressureControl.create(Patient::default());
        for (length, step) in [(10.0, 0.0), (10.0, -0.1), (f64::INFINITY, 0.02), (10.0, f64::NAN)] {
            assert!(matches!(
                vent.simulate(length, step),
                Err(VentError::InvalidTiming { .. })
            ));
        }
    }

    #[test]
    fn test_zero_compliance_rejected_at_run_start() {
        let mut vent = Mode::PressureSupport.create(Patient::new(0.0, 10.0));
        assert!(matches!(
            vent.simulate(1.0, 0.02),
            Err(VentError::InvalidPatient { parameter: "compliance", .. })
        ));
    }

    #[test]
    fn test_initial_sample_at_peep() {
        for mode in [Mode::PressureSupport, Mode::PressureControl, Mode::VolumeControl] {
            let mut vent = mode.create(Patient::default());
            vent.set(Setting::Peep, SettingValue::Number(5.0)).unwrap();
            vent.simulate(1.0, 0.02).unwrap();
            let first = vent.trace().samples()[0];
            assert_eq!(first.pressure_cmH2O, 5.0);
            assert_eq!(first.p_alv_cmH2O, 5.0);
            assert_eq!(first.flow_L_per_sec, 0.0);
            assert_eq!(first.volume_L, 0.0);
            assert_eq!(vent.trace().len(), 51);
        }
    }

    #[test]
    fn test_repeated_runs_reseed_patient() {
        let mut vent = Mode::PressureControl.create(Patient::default());
        vent.simulate(3.0, 0.02).unwrap();
        let first_run = vent.data(Channel::Volume);
        vent.simulate(3.0, 0.02).unwrap();
        assert_eq!(vent.data(Channel::Volume), first_run);
    }
}
