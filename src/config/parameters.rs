//! Run parameter structures loaded from JSON.
//!
//! A parameter file groups patient mechanics, run timing and mode selection,
//! and any number of ventilator setting overrides:
//!
//! ```json
//! {
//!   "patient": { "compliance_L_per_cmH2O": 0.05, "resistance_cmH2O_s_per_L": 10.0 },
//!   "run": { "mode": "volume_control", "time_length_sec": 12.0, "time_step_sec": 0.02 },
//!   "settings": { "peep": 5, "flow_pattern": "decelerating" }
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::settings::{Setting, SettingValue};
use crate::state::Patient;
use crate::ventilator::{
    Mode, PressureControlVentilator, PressureReference, PressureSupportVentilator, Ventilator,
    VolumeControlVentilator,
};

/// Top-level parameters container
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    /// Patient lung mechanics
    pub patient: PatientParameters,
    /// Run timing and mode selection
    pub run: RunParameters,
    /// Run-specific setting overrides keyed by setting name
    pub settings: BTreeMap<String, SettingValue>,
}

impl Parameters {
    /// Load parameters from a JSON file, failing on a missing or malformed file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters from {}", path.display()))?;
        let params = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse parameters in {}", path.display()))?;
        log::info!("Loaded run parameters from {:?}", path);
        Ok(params)
    }

    /// Load parameters from a JSON file or use defaults if it is missing or invalid
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(params) => {
                    log::info!("Loaded run parameters from {:?}", path.as_ref());
                    params
                }
                Err(e) => {
                    log::warn!("Failed to parse run parameters: {}, using defaults", e);
                    Self::default()
                }
            },
            Err(_) => {
                log::info!("Run parameters file not found, using defaults");
                Self::default()
            }
        }
    }

    /// Write patient mechanics and setting overrides onto a ventilator
    pub fn apply(&self, ventilator: &mut dyn Ventilator) -> Result<()> {
        let patient = ventilator.patient_mut();
        patient.compliance_L_per_cmH2O = self.patient.compliance_L_per_cmH2O;
        patient.resistance_cmH2O_s_per_L = self.patient.resistance_cmH2O_s_per_L;

        for (name, value) in &self.settings {
            let key: Setting = name.parse()?;
            ventilator.set(key, *value)?;
        }
        Ok(())
    }

    /// Build the configured ventilator with these parameters applied
    pub fn build_ventilator(&self) -> Result<Box<dyn Ventilator>> {
        let patient = self.patient.to_patient();
        let mut ventilator: Box<dyn Ventilator> = match self.run.mode {
            Mode::PressureSupport => Box::new(PressureSupportVentilator::new(patient)),
            Mode::PressureControl => Box::new(
                PressureControlVentilator::new(patient)
                    .with_pressure_reference(self.run.pressure_reference),
            ),
            Mode::VolumeControl => Box::new(VolumeControlVentilator::new(patient)),
        };
        self.apply(ventilator.as_mut())?;
        Ok(ventilator)
    }
}

/// Patient lung mechanics
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PatientParameters {
    /// Linear lung compliance (L/cmH2O)
    pub compliance_L_per_cmH2O: f64,
    /// Airway resistance (cmH2O·s/L)
    pub resistance_cmH2O_s_per_L: f64,
}

impl PatientParameters {
    pub fn to_patient(&self) -> Patient {
        Patient::new(self.compliance_L_per_cmH2O, self.resistance_cmH2O_s_per_L)
    }
}

impl Default for PatientParameters {
    fn default() -> Self {
        let patient = Patient::default();
        Self {
            compliance_L_per_cmH2O: patient.compliance_L_per_cmH2O,
            resistance_cmH2O_s_per_L: patient.resistance_cmH2O_s_per_L,
        }
    }
}

/// Run timing and mode selection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunParameters {
    /// Breath-delivery mode
    pub mode: Mode,
    /// Pressure-control inspiratory pressure reference
    pub pressure_reference: PressureReference,
    /// Simulated duration (s)
    pub time_length_sec: f64,
    /// Integration step (s)
    pub time_step_sec: f64,
}

impl Default for RunParameters {
    fn default() -> Self {
        Self {
            mode: Mode::PressureControl,
            pressure_reference: PressureReference::Absolute,
            // One interactive view of the waveforms
            time_length_sec: 12.0,
            time_step_sec: 0.02,
        }
    }
}
