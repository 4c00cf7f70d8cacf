//! Vent Simulator - single-compartment lung mechanics under mechanical ventilation
//!
//! This library drives a linear patient lung model with three breath-delivery
//! modes (pressure support, pressure control, volume control) and records
//! pressure, flow and volume traces for each run.

// Allow non-snake-case for unit suffixes in field names (L, cmH2O, etc.)
// This follows the project convention of including units in names.
#![allow(non_snake_case)]

pub mod config;
pub mod error;
pub mod export;
pub mod settings;
pub mod state;
pub mod ventilator;

pub use config::Parameters;
pub use error::{Result, VentError};
pub use settings::{FlowPattern, Setting, SettingValue, Settings, Tier};
pub use state::{BreathSummary, Channel, Patient, Phase, RunMetrics, Sample, Trace};
pub use ventilator::{
    Mode, PressureControlVentilator, PressureReference, PressureSupportVentilator, Ventilator,
    VolumeControlVentilator, CLOSE_ENOUGH,
};
