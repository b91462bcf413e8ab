//! Auxiliary panel channel configuration and processing
//!
//! Each of the seven pot channels is interpreted according to its kind:
//! a continuous axis, a debounced toggle switch, a momentary button, or
//! nothing at all.

use crate::calibration::{apply_invert, PERCENT_MAX};
use crate::error::ConfigError;
use crate::output::JoystickAxis;
use serde::{Deserialize, Deserializer, Serialize};

/// Number of pot channels on the control panel
pub const CHANNEL_COUNT: usize = 7;

/// Raw sample domain of a panel channel
pub const RAW_MIN: f64 = 0.0;
pub const RAW_MAX: f64 = 1023.0;

/// Highest button id the extended joystick contract accepts
pub const MAX_BUTTON_ID: u16 = 128;

/// Reading reported for a channel whose range has no usable width
pub const MIDPOINT: f64 = 50.0;

pub const DEFAULT_THRESHOLD: f64 = 50.0;

/// How a channel's value is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ChannelKind {
    #[default]
    Axis,
    /// Latching toggle: flips once per upward threshold crossing
    Switch,
    /// Momentary: pressed while above threshold
    Button,
    Disabled,
}

impl ChannelKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            ChannelKind::Axis => "Axis",
            ChannelKind::Switch => "Switch",
            ChannelKind::Button => "Button",
            ChannelKind::Disabled => "Disabled",
        }
    }

    /// Whether the channel produces a button decision
    pub fn is_discrete(&self) -> bool {
        matches!(self, ChannelKind::Switch | ChannelKind::Button)
    }
}

/// Configuration for one pot channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: String,
    #[serde(default, alias = "type")]
    pub kind: ChannelKind,
    #[serde(default, alias = "inversion")]
    pub invert: bool,
    /// Percentage (0-100) a Switch/Button must exceed to register
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_raw_min")]
    pub calibrated_min: f64,
    #[serde(default = "default_raw_max")]
    pub calibrated_max: f64,
    /// Extended joystick axis written by Axis channels
    #[serde(default, alias = "vjoy_axis", skip_serializing_if = "Option::is_none")]
    pub output_axis: Option<JoystickAxis>,
    /// 1-based button written by Switch/Button channels
    #[serde(
        default,
        alias = "button_id",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_button_id"
    )]
    pub output_button_id: Option<u16>,
}

fn default_threshold() -> f64 {
    DEFAULT_THRESHOLD
}
fn default_raw_min() -> f64 {
    RAW_MIN
}
fn default_raw_max() -> f64 {
    RAW_MAX
}

/// Accept a button id as a number, a numeric string, an empty string or null
///
/// Older settings files stored the id as the text typed into the UI.
fn deserialize_button_id<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u16>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ButtonIdRepr {
        Number(u16),
        Text(String),
    }

    match Option::<ButtonIdRepr>::deserialize(d)? {
        None => Ok(None),
        Some(ButtonIdRepr::Number(id)) => Ok(Some(id)),
        Some(ButtonIdRepr::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                Ok(None)
            } else {
                text.parse::<u16>().map(Some).map_err(|_| {
                    serde::de::Error::custom(format!("invalid button id: \"{text}\""))
                })
            }
        }
    }
}

/// Outcome of processing one raw channel sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ChannelReading {
    /// Display value: calibrated percentage for axes, 0/100 for Switch/Button
    pub value: f64,
    /// Threshold decision for Switch/Button channels
    pub above_threshold: Option<bool>,
}

impl ChannelConfig {
    /// Default configuration for the channel at `index`
    pub fn new(index: usize) -> Self {
        Self {
            name: format!("Pot {}", index + 1),
            kind: ChannelKind::Axis,
            invert: false,
            threshold: DEFAULT_THRESHOLD,
            calibrated_min: RAW_MIN,
            calibrated_max: RAW_MAX,
            output_axis: None,
            output_button_id: None,
        }
    }

    /// Calibration range actually used for mapping
    ///
    /// An empty or inverted range falls back to the full raw domain.
    pub fn effective_range(&self) -> (f64, f64) {
        if self.calibrated_min < self.calibrated_max {
            (self.calibrated_min, self.calibrated_max)
        } else {
            (RAW_MIN, RAW_MAX)
        }
    }

    /// Calibrated, inverted percentage before type interpretation
    pub fn calibrated(&self, raw: f64) -> f64 {
        let raw = if raw.is_nan() {
            RAW_MIN
        } else {
            raw.clamp(RAW_MIN, RAW_MAX)
        };
        let (lo, hi) = self.effective_range();
        let width = hi - lo;
        let percent = if width > 0.0 && width.is_finite() {
            ((raw - lo) / width * PERCENT_MAX).clamp(0.0, PERCENT_MAX)
        } else {
            MIDPOINT
        };
        apply_invert(percent, self.invert)
    }

    /// Interpret one raw sample according to the channel kind
    pub fn process(&self, raw: f64) -> ChannelReading {
        match self.kind {
            ChannelKind::Disabled => ChannelReading::default(),
            ChannelKind::Axis => ChannelReading {
                value: self.calibrated(raw),
                above_threshold: None,
            },
            ChannelKind::Switch | ChannelKind::Button => {
                let above = self.calibrated(raw) > self.threshold;
                ChannelReading {
                    value: if above { PERCENT_MAX } else { 0.0 },
                    above_threshold: Some(above),
                }
            }
        }
    }

    /// Check the fields that have a rejectable range
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_threshold(self.threshold)?;
        if let Some(id) = self.output_button_id {
            validate_button_id(id)?;
        }
        if !self.calibrated_min.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "calibrated_min",
            });
        }
        if !self.calibrated_max.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "calibrated_max",
            });
        }
        Ok(())
    }
}

pub(crate) fn validate_threshold(threshold: f64) -> Result<(), ConfigError> {
    if (0.0..=PERCENT_MAX).contains(&threshold) {
        Ok(())
    } else {
        Err(ConfigError::Threshold(threshold))
    }
}

pub(crate) fn validate_button_id(id: u16) -> Result<(), ConfigError> {
    if (1..=MAX_BUTTON_ID).contains(&id) {
        Ok(())
    } else {
        Err(ConfigError::ButtonId(id))
    }
}
