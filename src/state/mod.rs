//! State management for the lung simulation.
//!
//! Contains the patient lung model, the per-run recorded trace, and metrics
//! derived from a completed trace.

mod metrics;
mod patient;
mod trace;

pub use metrics::{BreathSummary, RunMetrics};
pub use patient::Patient;
pub use trace::{planned_steps, Channel, Phase, Sample, Trace};
