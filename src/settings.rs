//! Ventilator settings with layered resolution.
//!
//! A setting is resolved through three tiers, highest priority first:
//! 1. run-specific override (written by `Settings::set`)
//! 2. mode default (fixed per breath-delivery mode)
//! 3. global default (shared by every mode)
//!
//! Writes only ever touch the override tier.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, VentError};

/// Named ventilator settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Setting {
    /// Backup breath rate (breaths/min); 0 disables rate-triggered breaths
    RespiratoryRate,
    /// Positive end-expiratory pressure (cmH2O)
    Peep,
    /// Inspiratory hold duration (s)
    InspiratoryPause,
    /// Set inspiratory flow for volume control (L/s)
    Flow,
    /// Flow ramp-up time (s)
    RiseTime,
    /// Volume-control flow waveform
    FlowPattern,
    /// Tidal volume target (L)
    VolumeTarget,
    /// Inspiratory pressure target (cmH2O)
    PressureTarget,
    /// Time-cycled inspiration length (s)
    InspiratoryTime,
    /// Fraction of peak flow at which a pressure-support breath cycles off
    FlowTrigger,
}

impl Setting {
    /// Every setting, in declaration order
    pub const ALL: [Setting; 10] = [
        Setting::RespiratoryRate,
        Setting::Peep,
        Setting::InspiratoryPause,
        Setting::Flow,
        Setting::RiseTime,
        Setting::FlowPattern,
        Setting::VolumeTarget,
        Setting::PressureTarget,
        Setting::InspiratoryTime,
        Setting::FlowTrigger,
    ];

    /// Textual key used by configuration files and the command line
    pub fn name(&self) -> &'static str {
        match self {
            Setting::RespiratoryRate => "respiratory_rate",
            Setting::Peep => "peep",
            Setting::InspiratoryPause => "inspiratory_pause",
            Setting::Flow => "flow",
            Setting::RiseTime => "rise_time",
            Setting::FlowPattern => "flow_pattern",
            Setting::VolumeTarget => "volume_target",
            Setting::PressureTarget => "pressure_target",
            Setting::InspiratoryTime => "inspiratory_time",
            Setting::FlowTrigger => "flow_trigger",
        }
    }

    fn expects_pattern(&self) -> bool {
        matches!(self, Setting::FlowPattern)
    }
}

impl fmt::Display for Setting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Setting {
    type Err = VentError;

    fn from_str(s: &str) -> Result<Self> {
        Setting::ALL
            .iter()
            .copied()
            .find(|setting| setting.name() == s)
            .ok_or_else(|| VentError::UnknownSetting(s.to_string()))
    }
}

/// Volume-control inspiratory flow waveform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowPattern {
    /// Constant flow after an optional linear rise
    Square,
    /// Rise to twice the set flow, then linear decay to zero
    Decelerating,
}

impl FromStr for FlowPattern {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, ()> {
        match s {
            "square" => Ok(FlowPattern::Square),
            "decelerating" => Ok(FlowPattern::Decelerating),
            _ => Err(()),
        }
    }
}

/// Value held by a setting
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Number(f64),
    Pattern(FlowPattern),
}

impl From<f64> for SettingValue {
    fn from(value: f64) -> Self {
        SettingValue::Number(value)
    }
}

impl From<FlowPattern> for SettingValue {
    fn from(pattern: FlowPattern) -> Self {
        SettingValue::Pattern(pattern)
    }
}

/// Tier a resolved setting came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    Override,
    Mode,
    Global,
}

/// Global defaults shared by every mode
pub const GLOBAL_DEFAULTS: &[(Setting, SettingValue)] = &[
    (Setting::RespiratoryRate, SettingValue::Number(10.0)),
    (Setting::Peep, SettingValue::Number(0.0)),
    (Setting::InspiratoryPause, SettingValue::Number(0.0)),
    (Setting::RiseTime, SettingValue::Number(0.0)),
];

fn find_default(table: &[(Setting, SettingValue)], key: Setting) -> Option<SettingValue> {
    table
        .iter()
        .find(|(setting, _)| *setting == key)
        .map(|(_, value)| *value)
}

/// Layered settings table for one ventilator instance
#[derive(Debug, Clone)]
pub struct Settings {
    overrides: BTreeMap<Setting, SettingValue>,
    mode_defaults: &'static [(Setting, SettingValue)],
    mode_name: &'static str,
}

impl Settings {
    /// Create an empty override tier on top of the given mode defaults
    pub fn new(mode_name: &'static str, mode_defaults: &'static [(Setting, SettingValue)]) -> Self {
        Self {
            overrides: BTreeMap::new(),
            mode_defaults,
            mode_name,
        }
    }

    /// Lookup tiers in priority order
    fn resolve(&self, key: Setting) -> Option<(Tier, SettingValue)> {
        if let Some(value) = self.overrides.get(&key) {
            return Some((Tier::Override, *value));
        }
        let layers: [(Tier, &[(Setting, SettingValue)]); 2] =
            [(Tier::Mode, self.mode_defaults), (Tier::Global, GLOBAL_DEFAULTS)];
        layers
            .iter()
            .find_map(|(tier, table)| find_default(table, key).map(|value| (*tier, value)))
    }

    /// Resolve a setting through all three tiers
    pub fn get(&self, key: Setting) -> Result<SettingValue> {
        self.resolve(key)
            .map(|(_, value)| value)
            .ok_or(VentError::MissingSetting {
                setting: key,
                mode: self.mode_name,
            })
    }

    /// Resolve a numeric setting
    pub fn number(&self, key: Setting) -> Result<f64> {
        match self.get(key)? {
            SettingValue::Number(value) => Ok(value),
            SettingValue::Pattern(_) => Err(VentError::SettingType {
                setting: key,
                expected: "number",
            }),
        }
    }

    /// Resolve the flow pattern setting
    pub fn flow_pattern(&self) -> Result<FlowPattern> {
        match self.get(Setting::FlowPattern)? {
            SettingValue::Pattern(pattern) => Ok(pattern),
            SettingValue::Number(_) => Err(VentError::SettingType {
                setting: Setting::FlowPattern,
                expected: "flow pattern",
            }),
        }
    }

    /// Tier that currently supplies `key`, if any
    pub fn tier_of(&self, key: Setting) -> Option<Tier> {
        self.resolve(key).map(|(tier, _)| tier)
    }

    /// Write a run-specific override
    pub fn set(&mut self, key: Setting, value: impl Into<SettingValue>) -> Result<()> {
        let value = value.into();
        match (key.expects_pattern(), value) {
            (true, SettingValue::Number(_)) => Err(VentError::SettingType {
                setting: key,
                expected: "flow pattern",
            }),
            (false, SettingValue::Pattern(_)) => Err(VentError::SettingType {
                setting: key,
                expected: "number",
            }),
            _ => {
                self.overrides.insert(key, value);
                Ok(())
            }
        }
    }

    /// Parse and write an override from textual input
    pub fn set_by_name(&mut self, name: &str, text: &str) -> Result<()> {
        let key: Setting = name.parse()?;
        let text = text.trim();
        let value = if key.expects_pattern() {
            text.parse::<FlowPattern>().map(SettingValue::Pattern).ok()
        } else {
            text.parse::<f64>().map(SettingValue::Number).ok()
        };
        match value {
            Some(value) => self.set(key, value),
            None => Err(VentError::InvalidSettingValue {
                setting: key,
                value: text.to_string(),
            }),
        }
    }

    /// Remove a run-specific override, revealing the lower tiers
    pub fn clear(&mut self, key: Setting) -> Option<SettingValue> {
        self.overrides.remove(&key)
    }

    /// Remove every run-specific override
    pub fn clear_all(&mut self) {
        self.overrides.clear();
    }

    /// Name of the mode owning these settings
    pub fn mode_name(&self) -> &'static str {
        self.mode_name
    }
}
