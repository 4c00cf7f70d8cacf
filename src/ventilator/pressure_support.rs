//! Pressure-support ventilation.
//!
//! Inspiration drives the airway toward pressure_target above PEEP:
//! Q = ((P_target + PEEP) - P_alv) / R
//!
//! The breath is flow-cycled: inspiration ends once flow decays below
//! flow_trigger × the peak flow seen during this breath. Exhalation lasts
//! until the backup rate calls for the next breath. There is no
//! inspiratory pause in this mode.

use crate::error::Result;
use crate::settings::{Setting, SettingValue};
use crate::state::{Channel, Patient, Phase};

use super::{BreathHook, Mode, Ventilator, VentilatorCore};

/// Mode defaults for pressure support
pub const PRESSURE_SUPPORT_DEFAULTS: &[(Setting, SettingValue)] = &[
    (Setting::PressureTarget, SettingValue::Number(20.0)),
    (Setting::FlowTrigger, SettingValue::Number(0.25)),
];

/// Flow-cycled, pressure-targeted ventilator
#[derive(Debug, Clone)]
pub struct PressureSupportVentilator {
    core: VentilatorCore,
}

impl PressureSupportVentilator {
    pub fn new(patient: Patient) -> Self {
        Self {
            core: VentilatorCore::new(
                Mode::PressureSupport.name(),
                PRESSURE_SUPPORT_DEFAULTS,
                patient,
            ),
        }
    }
}

impl Default for PressureSupportVentilator {
    fn default() -> Self {
        Self::new(Patient::default())
    }
}

impl Ventilator for PressureSupportVentilator {
    fn mode(&self) -> Mode {
        Mode::PressureSupport
    }

    fn core(&self) -> &VentilatorCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut VentilatorCore {
        &mut self.core
    }

    fn run(&mut self, time_length: f64, time_step: f64, on_breath: BreathHook<'_>) -> Result<()> {
        let steps = self.core.begin_run(time_length, time_step)?;

        let mut phase = Phase::Inspiratory;
        let mut current_volume = 0.0;
        let mut last_breath_start = 0.0;
        let mut peak_flow = 0.0;
        let mut breaths = 1;
        on_breath(&mut self.core.settings, breaths);

        for step in 0..steps {
            let current_time = step as f64 * time_step;
            self.core.tick(current_time, phase)?;

            match phase {
                Phase::Inspiratory => {
                    let target = self.core.settings.number(Setting::PressureTarget)?
                        + self.core.settings.number(Setting::Peep)?;
                    let flow_trigger = self.core.settings.number(Setting::FlowTrigger)?;

                    let patient = &mut self.core.patient;
                    let flow = (target - patient.pressure_cmH2O()) / patient.resistance_cmH2O_s_per_L;
                    if flow > peak_flow {
                        peak_flow = flow;
                    }
                    let delta_volume = flow * time_step;
                    patient.add_volume(delta_volume);
                    current_volume += delta_volume;

                    if flow < peak_flow * flow_trigger {
                        log::debug!(
                            "t={:.2}s: flow {:.3} L/s below {:.0}% of peak {:.3} L/s, cycling to expiration",
                            current_time,
                            flow,
                            flow_trigger * 100.0,
                            peak_flow
                        );
                        phase = Phase::Expiratory;
                    }

                    let p_alv = self.core.patient.pressure_cmH2O();
                    self.core.record(&[
                        (Channel::Flow, flow),
                        (Channel::Volume, current_volume),
                        (Channel::Pressure, target),
                        (Channel::AlveolarPressure, p_alv),
                    ]);
                }
                Phase::InspiratoryPause | Phase::Expiratory => {
                    self.core.exhale(time_step, &mut current_volume)?;

                    if self.core.breath_due(current_time, last_breath_start)? {
                        breaths += 1;
                        log::debug!("t={:.2}s: breath {} triggered by backup rate", current_time, breaths);
                        on_breath(&mut self.core.settings, breaths);
                        phase = Phase::Inspiratory;
                        current_volume = 0.0;
                        peak_flow = 0.0;
                        last_breath_start = current_time;
                    }
                }
            }
        }

        self.core.finish_run(breaths);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_defaults() {
        let vent = PressureSupportVentilator::default();
        assert_eq!(vent.number(Setting::PressureTarget).unwrap(), 20.0);
        assert_eq!(vent.number(Setting::FlowTrigger).unwrap(), 0.25);
        assert_eq!(vent.number(Setting::RespiratoryRate).unwrap(), 10.0);
    }

    #[test]
    fn test_first_step_flow() {
        // Empty lung at PEEP 0: Q = (20 - 0) / 10 = 2 L/s
        let mut vent = PressureSupportVentilator::default();
        vent.simulate(0.1, 0.02).unwrap();
        let flow = vent.data(Channel::Flow);
        assert!((flow[1] - 2.0).abs() < 1e-12);
        assert_eq!(vent.data(Channel::Pressure)[1], 20.0);
    }

    #[test]
    fn test_no_inspiratory_pause_phase() {
        let mut vent = PressureSupportVentilator::default();
        vent.set(Setting::InspiratoryPause, SettingValue::Number(0.5)).unwrap();
        vent.simulate(12.0, 0.02).unwrap();
        assert!(vent.trace().phases().iter().all(|p| *p != Phase::InspiratoryPause));
    }
}
