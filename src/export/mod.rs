//! Export functionality for simulation data.
//!
//! Provides CSV trace export and JSON metrics export.

mod csv_export;
mod json_export;

pub use csv_export::{export_trace_csv, write_trace_csv, TraceRecord};
pub use json_export::{export_metrics_json, export_metrics_json_to, MetricsExport};
