//! CSV time-series export for recorded traces.
//!
//! Values are written in display units: flow in L/min and volume in mL.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::state::{Sample, Trace};

/// Record for CSV time-series export
#[derive(Debug, Clone, Serialize)]
pub struct TraceRecord {
    /// Simulation time (seconds)
    pub time_sec: f64,
    /// Airway pressure (cmH2O)
    pub pressure_cmH2O: f64,
    /// Flow (L/min)
    pub flow_L_per_min: f64,
    /// Volume delivered this breath (mL)
    pub volume_mL: f64,
    /// Alveolar pressure (cmH2O)
    pub p_alv_cmH2O: f64,
    /// Breath phase
    pub phase: &'static str,
}

impl From<&Sample> for TraceRecord {
    fn from(s: &Sample) -> Self {
        Self {
            time_sec: s.time_sec,
            pressure_cmH2O: s.pressure_cmH2O,
            flow_L_per_min: s.flow_L_per_sec * 60.0,
            volume_mL: s.volume_L * 1000.0,
            p_alv_cmH2O: s.p_alv_cmH2O,
            phase: s.phase.name(),
        }
    }
}

/// Write every sample of `trace` as CSV, header first
pub fn write_trace_csv<W: Write>(trace: &Trace, writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    for sample in trace.samples() {
        writer.serialize(TraceRecord::from(sample))?;
    }
    writer.flush()?;
    Ok(())
}

/// Export a trace into `dir` under a timestamped file name
///
/// Creates the directory if it doesn't exist.
/// Filename is auto-generated: `trace_<mode>_YYYYMMDD_HHMMSS.csv`
pub fn export_trace_csv<P: AsRef<Path>>(trace: &Trace, mode_name: &str, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("trace_{}_{}.csv", mode_name, timestamp));

    let file = File::create(&path)?;
    write_trace_csv(trace, file)?;

    log::info!("CSV trace exported: {} ({} samples)", path.display(), trace.len());
    Ok(path)
}
