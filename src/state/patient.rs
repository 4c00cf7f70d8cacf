//! Single-compartment patient lung model.
//!
//! Alveolar pressure follows linearly from volume:
//! P_alv = V / C
//!
//! Volume is measured above the relaxed lung (litres) and only changes
//! through `add_volume`.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VentError};

/// Patient lung state and mechanical parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Patient {
    /// Gas volume above baseline (L)
    pub volume_L: f64,
    /// Linear lung compliance (L/cmH2O)
    pub compliance_L_per_cmH2O: f64,
    /// Airway resistance (cmH2O·s/L)
    pub resistance_cmH2O_s_per_L: f64,
}

impl Patient {
    /// Create a patient with the given mechanics and an empty lung
    pub fn new(compliance_L_per_cmH2O: f64, resistance_cmH2O_s_per_L: f64) -> Self {
        Self {
            volume_L: 0.0,
            compliance_L_per_cmH2O,
            resistance_cmH2O_s_per_L,
        }
    }

    /// Seed the resting volume consistent with the given PEEP
    pub fn set_peep_hint(&mut self, peep_cmH2O: f64) {
        self.volume_L = self.compliance_L_per_cmH2O * peep_cmH2O;
    }

    /// Add (or with a negative delta, remove) gas volume.
    ///
    /// Negative volumes are valid transient states under strong expiratory flow.
    pub fn add_volume(&mut self, delta_volume_L: f64) {
        self.volume_L += delta_volume_L;
    }

    /// Alveolar pressure (cmH2O)
    pub fn pressure_cmH2O(&self) -> f64 {
        self.volume_L / self.compliance_L_per_cmH2O
    }

    /// Check that compliance and resistance are usable for a run
    pub fn validate(&self) -> Result<()> {
        let checks = [
            ("compliance", self.compliance_L_per_cmH2O),
            ("resistance", self.resistance_cmH2O_s_per_L),
        ];
        for (parameter, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(VentError::InvalidPatient { parameter, value });
            }
        }
        Ok(())
    }
}

impl Default for Patient {
    fn default() -> Self {
        Self::new(0.05, 10.0)
    }
}
