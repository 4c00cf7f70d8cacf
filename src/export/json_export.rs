//! JSON export of run metrics.

use std::path::{Path, PathBuf};

use anyhow::Result;
use chrono::Local;
use serde::Serialize;

use crate::state::RunMetrics;

/// Metrics export structure
#[derive(Debug, Clone, Serialize)]
pub struct MetricsExport<'a> {
    /// Export timestamp
    pub exported_at: String,
    /// Export version for compatibility
    pub version: &'static str,
    /// Breath-delivery mode of the run
    pub mode: &'a str,
    /// Metrics of the run
    pub metrics: &'a RunMetrics,
}

/// Export run metrics into `dir` under a timestamped file name
///
/// Creates the directory if it doesn't exist.
/// Filename is auto-generated: `metrics_<mode>_YYYYMMDD_HHMMSS.json`
pub fn export_metrics_json<P: AsRef<Path>>(metrics: &RunMetrics, mode_name: &str, dir: P) -> Result<PathBuf> {
    let dir = dir.as_ref();
    std::fs::create_dir_all(dir)?;

    let timestamp = Local::now();
    let path = dir.join(format!(
        "metrics_{}_{}.json",
        mode_name,
        timestamp.format("%Y%m%d_%H%M%S")
    ));
    export_metrics_json_to(metrics, mode_name, &path)?;
    Ok(path)
}

/// Export metrics to a specific file
pub fn export_metrics_json_to(metrics: &RunMetrics, mode_name: &str, path: &Path) -> Result<()> {
    let export = MetricsExport {
        exported_at: Local::now().to_rfc3339(),
        version: "1.0.0",
        mode: mode_name,
        metrics,
    };

    let file = std::fs::File::create(path)?;
    serde_json::to_writer_pretty(file, &export)?;

    log::info!("JSON metrics exported: {}", path.display());
    Ok(())
}
