//! Vent Simulator - Entry point
//!
//! Runs one ventilator simulation and prints a breath-by-breath summary.
//!
//! CLI Usage:
//!   cargo run                                  # Pressure control, 12 s, defaults
//!   cargo run -- --mode vc --set peep=5        # Volume control with PEEP 5
//!   cargo run -- --params run.json --csv exports

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{anyhow, Result};
use vent_simulator::{
    export::{export_metrics_json, export_trace_csv},
    Mode, Parameters, PressureReference, RunMetrics, Setting,
};

/// Command-line options
#[derive(Debug, Default)]
struct Options {
    params_path: Option<PathBuf>,
    mode: Option<Mode>,
    time_length_sec: Option<f64>,
    time_step_sec: Option<f64>,
    above_peep: bool,
    settings: Vec<(String, String)>,
    csv_dir: Option<PathBuf>,
    json_dir: Option<PathBuf>,
}

fn print_help() {
    println!("Vent Simulator");
    println!();
    println!("Usage: vent-simulator [OPTIONS]");
    println!();
    println!("Options:");
    println!("  --mode, -m MODE      Breath-delivery mode: ps, pc or vc (default: pc)");
    println!("  -t, --time SECS      Simulated duration in seconds (default: 12)");
    println!("  --dt SECS            Integration step in seconds (default: 0.02)");
    println!("  --set KEY=VALUE      Override a ventilator setting (repeatable)");
    println!("  --above-peep         Pressure control: deliver pressure_target above PEEP");
    println!("  --params FILE        Load patient/run/settings from a JSON file");
    println!("  --csv DIR            Export the trace as CSV into DIR");
    println!("  --json DIR           Export run metrics as JSON into DIR");
    println!("  --help, -h           Show this help");
    println!();
    println!("Settings:");
    for setting in Setting::ALL {
        println!("  {}", setting);
    }
}

fn next_value<'a>(args: &'a [String], i: &mut usize, flag: &str) -> Result<&'a str> {
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| anyhow!("{} requires a value", flag))
}

/// Parse CLI arguments
fn parse_args() -> Result<Options> {
    let args: Vec<String> = std::env::args().collect();
    let mut options = Options::default();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "--mode" | "-m" => {
                let value = next_value(&args, &mut i, flag)?;
                options.mode = Some(value.parse().map_err(|e: String| anyhow!(e))?);
            }
            "-t" | "--time" => {
                options.time_length_sec = Some(next_value(&args, &mut i, flag)?.parse()?);
            }
            "--dt" => {
                options.time_step_sec = Some(next_value(&args, &mut i, flag)?.parse()?);
            }
            "--set" => {
                let value = next_value(&args, &mut i, flag)?;
                let (key, setting) = value
                    .split_once('=')
                    .ok_or_else(|| anyhow!("--set expects KEY=VALUE, got '{}'", value))?;
                options.settings.push((key.to_string(), setting.to_string()));
            }
            "--above-peep" => options.above_peep = true,
            "--params" => {
                options.params_path = Some(PathBuf::from(next_value(&args, &mut i, flag)?));
            }
            "--csv" => {
                options.csv_dir = Some(PathBuf::from(next_value(&args, &mut i, flag)?));
            }
            "--json" => {
                options.json_dir = Some(PathBuf::from(next_value(&args, &mut i, flag)?));
            }
            "--help" | "-h" => {
                print_help();
                std::process::exit(0);
            }
            other => log::warn!("Ignoring unknown argument: {}", other),
        }
        i += 1;
    }

    Ok(options)
}

fn main() -> Result<()> {
    env_logger::init();

    let options = parse_args()?;

    let mut params = match &options.params_path {
        Some(path) => Parameters::load(path)?,
        None => Parameters::default(),
    };
    if let Some(mode) = options.mode {
        params.run.mode = mode;
    }
    if let Some(time_length) = options.time_length_sec {
        params.run.time_length_sec = time_length;
    }
    if let Some(time_step) = options.time_step_sec {
        params.run.time_step_sec = time_step;
    }
    if options.above_peep {
        params.run.pressure_reference = PressureReference::AbovePeep;
    }

    let mut ventilator = params.build_ventilator()?;
    for (key, value) in &options.settings {
        ventilator.settings_mut().set_by_name(key, value)?;
    }

    println!("=== Vent Simulator - {} ===\n", ventilator.mode());
    let patient = ventilator.patient();
    println!(
        "Patient: C={} L/cmH2O, R={} cmH2O·s/L",
        patient.compliance_L_per_cmH2O, patient.resistance_cmH2O_s_per_L
    );
    for setting in Setting::ALL {
        if let Ok(value) = ventilator.get(setting) {
            println!("  {:<18} {:?}", setting.name(), value);
        }
    }
    println!();

    let start_time = Instant::now();
    ventilator.simulate(params.run.time_length_sec, params.run.time_step_sec)?;
    let elapsed = start_time.elapsed();

    let metrics = RunMetrics::from_trace(ventilator.trace());
    metrics.print_summary();
    println!();
    println!("Elapsed time: {:.2?}", elapsed);

    let mode_name = ventilator.mode().name();
    if let Some(dir) = &options.csv_dir {
        let path = export_trace_csv(ventilator.trace(), mode_name, dir)?;
        println!("Trace written to {}", path.display());
    }
    if let Some(dir) = &options.json_dir {
        let path = export_metrics_json(&metrics, mode_name, dir)?;
        println!("Metrics written to {}", path.display());
    }

    Ok(())
}
