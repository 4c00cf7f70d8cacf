//! Breath-by-breath metrics derived from a recorded trace.
//!
//! The trace is split at every inspiratory phase entry; each segment runs
//! until the sample before the next breath starts (or the end of the run).

use serde::{Deserialize, Serialize};

use super::trace::{Phase, Sample, Trace};

/// Summary of one breath
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BreathSummary {
    /// 1-based breath number within the run
    pub breath_number: usize,
    /// Time of the first inspiratory sample (s)
    pub start_time_sec: f64,
    /// Time until the next breath starts (s); `None` for the final breath
    pub duration_sec: Option<f64>,
    /// Time spent in the inspiratory phase (s); `None` if the run ended mid-inspiration
    pub inspiratory_time_sec: Option<f64>,
    /// Highest airway pressure (cmH2O)
    pub peak_pressure_cmH2O: f64,
    /// Highest alveolar pressure (cmH2O)
    pub peak_p_alv_cmH2O: f64,
    /// Highest inspiratory flow (L/s)
    pub peak_flow_L_per_sec: f64,
    /// Largest volume delivered during the breath (L)
    pub tidal_volume_L: f64,
    /// Volume at the last sample of the breath (L)
    pub end_volume_L: f64,
}

impl BreathSummary {
    fn from_segment(breath_number: usize, segment: &[Sample], next_start: Option<f64>) -> Self {
        let start_time_sec = segment[0].time_sec;
        let inspiratory_time_sec = segment
            .iter()
            .find(|s| s.phase != Phase::Inspiratory)
            .map(|s| s.time_sec - start_time_sec);

        let peak = |f: fn(&Sample) -> f64| segment.iter().map(f).fold(f64::NEG_INFINITY, f64::max);

        Self {
            breath_number,
            start_time_sec,
            duration_sec: next_start.map(|t| t - start_time_sec),
            inspiratory_time_sec,
            peak_pressure_cmH2O: peak(|s| s.pressure_cmH2O),
            peak_p_alv_cmH2O: peak(|s| s.p_alv_cmH2O),
            peak_flow_L_per_sec: peak(|s| s.flow_L_per_sec),
            tidal_volume_L: peak(|s| s.volume_L),
            end_volume_L: segment[segment.len() - 1].volume_L,
        }
    }
}

/// Metrics for a complete run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Simulated duration covered by the trace (s)
    pub simulated_time_sec: f64,
    /// Number of recorded samples
    pub sample_count: usize,
    /// Number of breaths started
    pub breath_count: usize,
    /// Mean interval between consecutive breath starts (s)
    pub mean_breath_interval_sec: Option<f64>,
    /// Highest airway pressure over the run (cmH2O)
    pub peak_pressure_cmH2O: f64,
    /// Per-breath summaries
    pub breaths: Vec<BreathSummary>,
}

impl RunMetrics {
    /// Compute metrics from a completed trace
    pub fn from_trace(trace: &Trace) -> Self {
        let samples = trace.samples();
        let starts = trace.breath_starts();

        let breaths: Vec<BreathSummary> = starts
            .iter()
            .enumerate()
            .map(|(n, &start)| {
                let end = starts.get(n + 1).copied().unwrap_or(samples.len());
                let next_start = starts.get(n + 1).map(|&i| samples[i].time_sec);
                BreathSummary::from_segment(n + 1, &samples[start..end], next_start)
            })
            .collect();

        let intervals: Vec<f64> = breaths.iter().filter_map(|b| b.duration_sec).collect();
        let mean_breath_interval_sec = if intervals.is_empty() {
            None
        } else {
            Some(intervals.iter().sum::<f64>() / intervals.len() as f64)
        };

        Self {
            simulated_time_sec: samples.last().map(|s| s.time_sec).unwrap_or(0.0),
            sample_count: samples.len(),
            breath_count: breaths.len(),
            mean_breath_interval_sec,
            peak_pressure_cmH2O: samples
                .iter()
                .map(|s| s.pressure_cmH2O)
                .fold(f64::NEG_INFINITY, f64::max),
            breaths,
        }
    }

    /// Print a formatted summary
    pub fn print_summary(&self) {
        println!("Simulated time: {:.2} s ({} samples)", self.simulated_time_sec, self.sample_count);
        println!("Breaths: {}", self.breath_count);
        if let Some(interval) = self.mean_breath_interval_sec {
            println!("Mean breath interval: {:.2} s", interval);
        }
        println!("Peak pressure: {:.2} cmH2O", self.peak_pressure_cmH2O);
        println!();
        for breath in &self.breaths {
            println!(
                "  #{:<3} t={:6.2}s  Ti={:>6}  Ppeak={:6.2}  Palv={:6.2}  Vt={:6.1} mL  Qpeak={:6.1} L/min",
                breath.breath_number,
                breath.start_time_sec,
                breath
                    .inspiratory_time_sec
                    .map(|t| format!("{:.2}s", t))
                    .unwrap_or_else(|| "-".to_string()),
                breath.peak_pressure_cmH2O,
                breath.peak_p_alv_cmH2O,
                breath.tidal_volume_L * 1000.0,
                breath.peak_flow_L_per_sec * 60.0,
            );
        }
    }
}
