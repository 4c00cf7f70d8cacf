//! Pressure-control ventilation.
//!
//! Inspiration drives the airway toward the inspiratory pressure:
//! Q = (P_insp - P_alv) / R
//!
//! The breath is time-cycled: inspiration ends once the time since the breath
//! started exceeds inspiratory_time, followed by an optional static hold of
//! inspiratory_pause seconds before passive exhalation.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::{Setting, SettingValue};
use crate::state::{Channel, Patient, Phase};

use super::{BreathHook, Mode, Ventilator, VentilatorCore};

/// Mode defaults for pressure control
pub const PRESSURE_CONTROL_DEFAULTS: &[(Setting, SettingValue)] = &[
    (Setting::PressureTarget, SettingValue::Number(20.0)),
    (Setting::InspiratoryTime, SettingValue::Number(0.8)),
];

/// How pressure_target relates to the delivered inspiratory pressure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PressureReference {
    /// Inspiratory pressure is pressure_target itself
    #[default]
    Absolute,
    /// Inspiratory pressure is pressure_target + PEEP
    AbovePeep,
}

/// Time-cycled, pressure-targeted ventilator
#[derive(Debug, Clone)]
pub struct PressureControlVentilator {
    core: VentilatorCore,
    pressure_reference: PressureReference,
}

impl PressureControlVentilator {
    pub fn new(patient: Patient) -> Self {
        Self {
            core: VentilatorCore::new(
                Mode::PressureControl.name(),
                PRESSURE_CONTROL_DEFAULTS,
                patient,
            ),
            pressure_reference: PressureReference::default(),
        }
    }

    pub fn with_pressure_reference(mut self, reference: PressureReference) -> Self {
        self.pressure_reference = reference;
        self
    }

    pub fn pressure_reference(&self) -> PressureReference {
        self.pressure_reference
    }

    pub fn set_pressure_reference(&mut self, reference: PressureReference) {
        self.pressure_reference = reference;
    }

    /// Airway pressure applied during inspiration (cmH2O)
    fn inspiratory_pressure(&self) -> Result<f64> {
        let target = self.core.settings.number(Setting::PressureTarget)?;
        Ok(match self.pressure_reference {
            PressureReference::Absolute => target,
            PressureReference::AbovePeep => target + self.core.settings.number(Setting::Peep)?,
        })
    }
}

impl Default for PressureControlVentilator {
    fn default() -> Self {
        Self::new(Patient::default())
    }
}

impl Ventilator for PressureControlVentilator {
    fn mode(&self) -> Mode {
        Mode::PressureControl
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
        let mut last_pause_start = 0.0;
        let mut breaths = 1;
        on_breath(&mut self.core.settings, breaths);

        for step in 0..steps {
            let current_time = step as f64 * time_step;
            self.core.tick(current_time, phase)?;

            match phase {
                Phase::Inspiratory => {
                    let pressure = self.inspiratory_pressure()?;
                    let inspiratory_time = self.core.settings.number(Setting::InspiratoryTime)?;

                    let patient = &mut self.core.patient;
                    let flow = (pressure - patient.pressure_cmH2O()) / patient.resistance_cmH2O_s_per_L;
                    let delta_volume = flow * time_step;
                    patient.add_volume(delta_volume);
                    current_volume += delta_volume;

                    if current_time - last_breath_start > inspiratory_time {
                        phase = self.core.phase_after_inspiration()?;
                        if phase == Phase::InspiratoryPause {
                            last_pause_start = current_time;
                        }
                        log::debug!("t={:.2}s: inspiratory time elapsed, entering {}", current_time, phase);
                    }

                    let p_alv = self.core.patient.pressure_cmH2O();
                    self.core.record(&[
                        (Channel::Flow, flow),
                        (Channel::Volume, current_volume),
                        (Channel::Pressure, pressure),
                        (Channel::AlveolarPressure, p_alv),
                    ]);
                }
                Phase::InspiratoryPause => {
                    self.core.hold(current_volume);
                    let pause = self.core.settings.number(Setting::InspiratoryPause)?;
                    if current_time > last_pause_start + pause {
                        log::debug!("t={:.2}s: pause complete, entering expiratory", current_time);
                        phase = Phase::Expiratory;
                    }
                }
                Phase::Expiratory => {
                    self.core.exhale(time_step, &mut current_volume)?;

                    if self.core.breath_due(current_time, last_breath_start)? {
                        breaths += 1;
                        log::debug!("t={:.2}s: breath {} triggered by backup rate", current_time, breaths);
                        on_breath(&mut self.core.settings, breaths);
                        phase = Phase::Inspiratory;
                        current_volume = 0.0;
                        last_breath_start = current_time;
                    }
                }
            }
        }

        self.core.finish_run(breaths);
        Ok(())
    }
}
