//! Configuration module for loading run parameters.
//!
//! Patient mechanics, run timing and ventilator setting overrides can be
//! supplied as JSON; anything omitted falls back to defaults.

mod parameters;

pub use parameters::{Parameters, PatientParameters, RunParameters};
