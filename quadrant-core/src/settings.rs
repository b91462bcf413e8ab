//! Persistable engine settings
//!
//! Field names follow the on-disk format. Aliases accept files written by
//! older releases (`controller_type`, `speedbrake_mode`, `pot_config`).
//! Their runtime `button_states` map was never part of the settings file
//! and is ignored.

use crate::calibration::ThrottleCalibration;
use crate::channel::{ChannelConfig, CHANNEL_COUNT};
use crate::error::ConfigError;
use crate::profile::{ModeState, OutputKind, SimProfile};
use crate::toggle::ToggleRecord;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub profile: SimProfile,

    #[serde(default, alias = "controller_type")]
    pub output_kind: OutputKind,

    #[serde(default, alias = "speedbrake_mode")]
    pub prop_as_speedbrake: bool,

    #[serde(default = "default_true")]
    pub controls_active: bool,

    #[serde(default)]
    pub calibration: ThrottleCalibration,

    #[serde(default = "default_channels", alias = "pot_config")]
    pub channels: Vec<ChannelConfig>,

    #[serde(default)]
    pub toggle_states: Vec<ToggleRecord>,
}

fn default_true() -> bool {
    true
}

fn default_channels() -> Vec<ChannelConfig> {
    (0..CHANNEL_COUNT).map(ChannelConfig::new).collect()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            profile: SimProfile::default(),
            output_kind: OutputKind::default(),
            prop_as_speedbrake: false,
            controls_active: true,
            calibration: ThrottleCalibration::default(),
            channels: default_channels(),
            toggle_states: Vec::new(),
        }
    }
}

impl Settings {
    pub fn mode(&self) -> ModeState {
        ModeState {
            profile: self.profile,
            output_kind: self.output_kind,
            prop_as_speedbrake: self.prop_as_speedbrake,
            active: self.controls_active,
        }
    }

    /// Check everything an engine would reject on import
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.calibration.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "calibration",
            });
        }
        if self.channels.len() > CHANNEL_COUNT {
            return Err(ConfigError::ChannelCount(self.channels.len()));
        }
        for channel in &self.channels {
            channel.validate()?;
        }
        for record in &self.toggle_states {
            if record.channel >= CHANNEL_COUNT {
                return Err(ConfigError::ChannelIndex(record.channel));
            }
        }
        Ok(())
    }
}
