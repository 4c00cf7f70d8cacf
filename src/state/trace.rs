//! Recorded time series for one simulation run.
//!
//! Samples are stored in chronological order in storage sized up front for
//! the planned number of steps. Reading a channel returns it oldest first.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VentError};

/// Breath phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Inspiratory,
    InspiratoryPause,
    Expiratory,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Phase::Inspiratory => "inspiratory",
            Phase::InspiratoryPause => "inspiratory_pause",
            Phase::Expiratory => "expiratory",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Recorded channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Simulated time (s)
    Time,
    /// Airway pressure delivered by the ventilator (cmH2O)
    Pressure,
    /// Flow into the lung (L/s), negative during exhalation
    Flow,
    /// Volume delivered since the current breath started (L)
    Volume,
    /// Alveolar pressure (cmH2O)
    AlveolarPressure,
}

impl Channel {
    pub const ALL: [Channel; 5] = [
        Channel::Time,
        Channel::Pressure,
        Channel::Flow,
        Channel::Volume,
        Channel::AlveolarPressure,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Channel::Time => "time",
            Channel::Pressure => "pressure",
            Channel::Flow => "flow",
            Channel::Volume => "volume",
            Channel::AlveolarPressure => "p_alv",
        }
    }
}

impl FromStr for Channel {
    type Err = VentError;

    fn from_str(s: &str) -> Result<Self> {
        Channel::ALL
            .iter()
            .copied()
            .find(|channel| channel.name() == s)
            .ok_or_else(|| VentError::UnknownChannel(s.to_string()))
    }
}

/// One recorded step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub time_sec: f64,
    pub pressure_cmH2O: f64,
    pub flow_L_per_sec: f64,
    pub volume_L: f64,
    pub p_alv_cmH2O: f64,
    /// Phase active while this step was integrated
    pub phase: Phase,
}

impl Sample {
    /// Sample with only time and phase known; every other channel is NaN
    fn unset(time_sec: f64, phase: Phase) -> Self {
        Self {
            time_sec,
            pressure_cmH2O: f64::NAN,
            flow_L_per_sec: f64::NAN,
            volume_L: f64::NAN,
            p_alv_cmH2O: f64::NAN,
            phase,
        }
    }

    pub fn get(&self, channel: Channel) -> f64 {
        match channel {
            Channel::Time => self.time_sec,
            Channel::Pressure => self.pressure_cmH2O,
            Channel::Flow => self.flow_L_per_sec,
            Channel::Volume => self.volume_L,
            Channel::AlveolarPressure => self.p_alv_cmH2O,
        }
    }

    fn set(&mut self, channel: Channel, value: f64) {
        match channel {
            Channel::Time => self.time_sec = value,
            Channel::Pressure => self.pressure_cmH2O = value,
            Channel::Flow => self.flow_L_per_sec = value,
            Channel::Volume => self.volume_L = value,
            Channel::AlveolarPressure => self.p_alv_cmH2O = value,
        }
    }
}

/// Number of loop iterations for a run: steps `i` with `i * time_step < time_length`
pub fn planned_steps(time_length: f64, time_step: f64) -> usize {
    if time_length <= 0.0 {
        return 0;
    }
    let mut steps = (time_length / time_step).ceil() as usize;
    while steps > 0 && (steps - 1) as f64 * time_step >= time_length {
        steps -= 1;
    }
    while (steps as f64) * time_step < time_length {
        steps += 1;
    }
    steps
}

/// Fixed-capacity chronological trace
#[derive(Debug, Clone, Default)]
pub struct Trace {
    samples: Vec<Sample>,
    capacity: usize,
}

impl Trace {
    /// Allocate storage for exactly `capacity` samples
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Record the resting initial condition at the given PEEP
    pub(crate) fn seed(&mut self, peep_cmH2O: f64) -> Result<()> {
        self.tick(0.0, Phase::Expiratory)?;
        self.record(&[
            (Channel::Pressure, peep_cmH2O),
            (Channel::Flow, 0.0),
            (Channel::Volume, 0.0),
            (Channel::AlveolarPressure, peep_cmH2O),
        ]);
        Ok(())
    }

    /// Open a new current sample
    pub fn tick(&mut self, time_sec: f64, phase: Phase) -> Result<()> {
        if self.samples.len() >= self.capacity {
            return Err(VentError::TraceFull {
                capacity: self.capacity,
            });
        }
        self.samples.push(Sample::unset(time_sec, phase));
        Ok(())
    }

    /// Merge values into the current sample; channels not given are left as they are
    pub fn record(&mut self, values: &[(Channel, f64)]) {
        if let Some(current) = self.samples.last_mut() {
            for (channel, value) in values {
                current.set(*channel, *value);
            }
        }
    }

    /// One channel, oldest first
    pub fn data(&self, channel: Channel) -> Vec<f64> {
        self.samples.iter().map(|s| s.get(channel)).collect()
    }

    /// One channel by textual name
    pub fn data_by_name(&self, name: &str) -> Result<Vec<f64>> {
        Ok(self.data(name.parse()?))
    }

    pub fn phases(&self) -> Vec<Phase> {
        self.samples.iter().map(|s| s.phase).collect()
    }

    /// Sample indices at which an inspiratory phase begins
    pub fn breath_starts(&self) -> Vec<usize> {
        self.samples
            .iter()
            .enumerate()
            .filter(|(i, s)| {
                s.phase == Phase::Inspiratory
                    && (*i == 0 || self.samples[i - 1].phase != Phase::Inspiratory)
            })
            .map(|(i, _)| i)
            .collect()
    }

    pub fn samples(&self) -> &[Sample] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
