//! Error types for the simulation core.

use crate::settings::Setting;

/// Errors raised by the simulation core.
///
/// All of these are configuration errors: they are fatal at the point of use
/// and never retried.
#[derive(Debug, thiserror::Error)]
pub enum VentError {
    #[error("Unknown setting: {0}")]
    UnknownSetting(String),

    #[error("Unknown trace channel: {0}")]
    UnknownChannel(String),

    #[error("Setting '{setting}' is not defined for {mode} (no override, mode default or global default)")]
    MissingSetting { setting: Setting, mode: &'static str },

    #[error("Setting '{setting}' does not hold a {expected}")]
    SettingType {
        setting: Setting,
        expected: &'static str,
    },

    #[error("Invalid value for setting '{setting}': {value}")]
    InvalidSettingValue { setting: Setting, value: String },

    #[error("Invalid patient {parameter}: {value} (must be finite and > 0)")]
    InvalidPatient { parameter: &'static str, value: f64 },

    #[error("Invalid run timing: time_length={time_length}, time_step={time_step}")]
    InvalidTiming { time_length: f64, time_step: f64 },

    #[error("Trace is full ({capacity} samples)")]
    TraceFull { capacity: usize },
}

/// Result alias for the simulation core
pub type Result<T> = std::result::Result<T, VentError>;
