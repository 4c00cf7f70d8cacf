//! Volume-control ventilation.
//!
//! Inspiratory flow follows a waveform precomputed at the start of every
//! breath; airway pressure is the resistive drop plus elastic recoil:
//! P_aw = Q × R + P_alv
//!
//! The breath is volume-cycled: inspiration ends once the delivered volume is
//! within `CLOSE_ENOUGH` of volume_target.
//!
//! Waveforms:
//! - square: linear rise 0 → flow over rise_time, then constant flow
//! - decelerating: linear rise 0 → 2×flow over rise_time, then a linear
//!   decay 2×flow → 0 sized so the whole breath delivers volume_target

use crate::error::Result;
use crate::settings::{FlowPattern, Setting, SettingValue, Settings};
use crate::state::{Channel, Patient, Phase};

use super::{BreathHook, Mode, Ventilator, VentilatorCore, CLOSE_ENOUGH};

/// Mode defaults for volume control
pub const VOLUME_CONTROL_DEFAULTS: &[(Setting, SettingValue)] = &[
    (Setting::Flow, SettingValue::Number(1.0)),
    (Setting::VolumeTarget, SettingValue::Number(0.5)),
    (Setting::FlowPattern, SettingValue::Pattern(FlowPattern::Square)),
];

/// `num` evenly spaced values from `start` to `stop` inclusive
fn linspace(start: f64, stop: f64, num: usize) -> Vec<f64> {
    match num {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (num - 1) as f64;
            (0..num).map(|i| start + step * i as f64).collect()
        }
    }
}

fn steps_for(duration_sec: f64, time_step: f64) -> usize {
    if duration_sec.is_finite() && duration_sec > 0.0 {
        (duration_sec / time_step).ceil() as usize
    } else {
        0
    }
}

/// Per-step inspiratory flow waveform.
///
/// Consumed one value per step; once exhausted the last value is held.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowProfile {
    values: Vec<f64>,
    cursor: usize,
}

impl FlowProfile {
    /// Build the waveform for the current settings
    pub fn from_settings(settings: &Settings, time_step: f64) -> Result<Self> {
        let flow = settings.number(Setting::Flow)?;
        let rise_time = settings.number(Setting::RiseTime)?;
        let rise_steps = steps_for(rise_time, time_step);

        let values = match settings.flow_pattern()? {
            FlowPattern::Square => {
                let mut values: Vec<f64> = linspace(0.0, 1.0, rise_steps)
                    .into_iter()
                    .map(|f| f * flow)
                    .collect();
                values.push(flow);
                values
            }
            FlowPattern::Decelerating => {
                let volume_target = settings.number(Setting::VolumeTarget)?;
                let mut values: Vec<f64> = linspace(0.0, 2.0, rise_steps)
                    .into_iter()
                    .map(|f| f * flow)
                    .collect();
                let rise_volume: f64 = values.iter().sum::<f64>() * time_step;
                let decay_time = (volume_target - rise_volume) / flow;
                let decay_steps = steps_for(decay_time, time_step);
                values.extend(linspace(2.0, 0.0, decay_steps).into_iter().map(|f| f * flow));
                values
            }
        };

        Ok(Self { values, cursor: 0 })
    }

    /// Flow for the next step (L/s)
    pub fn next_flow(&mut self) -> f64 {
        let flow = self.values.get(self.cursor).copied().unwrap_or(0.0);
        if self.cursor + 1 < self.values.len() {
            self.cursor += 1;
        }
        flow
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// Volume-cycled, flow-targeted ventilator
#[derive(Debug, Clone)]
pub struct VolumeControlVentilator {
    core: VentilatorCore,
}

impl VolumeControlVentilator {
    pub fn new(patient: Patient) -> Self {
        Self {
            core: VentilatorCore::new(Mode::VolumeControl.name(), VOLUME_CONTROL_DEFAULTS, patient),
        }
    }
}

impl Default for VolumeControlVentilator {
    fn default() -> Self {
        Self::new(Patient::default())
    }
}

impl Ventilator for VolumeControlVentilator {
    fn mode(&self) -> Mode {
        Mode::VolumeControl
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
        let mut profile = FlowProfile::from_settings(&self.core.settings, time_step)?;

        for step in 0..steps {
            let current_time = step as f64 * time_step;
            self.core.tick(current_time, phase)?;

            match phase {
                Phase::Inspiratory => {
                    let volume_target = self.core.settings.number(Setting::VolumeTarget)?;

                    let flow = profile.next_flow();
                    let delta_volume = flow * time_step;
                    self.core.patient.add_volume(delta_volume);
                    current_volume += delta_volume;

                    if volume_target - current_volume < CLOSE_ENOUGH {
                        phase = self.core.phase_after_inspiration()?;
                        if phase == Phase::InspiratoryPause {
                            last_pause_start = current_time;
                        }
                        log::debug!(
                            "t={:.2}s: delivered {:.3} L of {:.3} L, entering {}",
                            current_time,
                            current_volume,
                            volume_target,
                            phase
                        );
                    }

                    let p_alv = self.core.patient.pressure_cmH2O();
                    let pressure = flow * self.core.patient.resistance_cmH2O_s_per_L + p_alv;
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
                        profile = FlowProfile::from_settings(&self.core.settings, time_step)?;
                    }
                }
            }
        }

        self.core.finish_run(breaths);
        Ok(())
    }
}
