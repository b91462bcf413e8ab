//! Simulator profile and output device selection

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Target simulator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SimProfile {
    #[default]
    #[serde(rename = "MSFS")]
    Msfs,
    #[serde(rename = "DCS")]
    Dcs,
    #[serde(rename = "XPLANE", alias = "X_PLANE")]
    XPlane,
    #[serde(rename = "IL2", alias = "IL_2")]
    Il2,
    #[serde(rename = "WAR_THUNDER")]
    WarThunder,
}

impl SimProfile {
    /// Cycle order used by [`SimProfile::next`]
    pub const ALL: &'static [SimProfile] = &[
        SimProfile::Msfs,
        SimProfile::Dcs,
        SimProfile::XPlane,
        SimProfile::Il2,
        SimProfile::WarThunder,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            SimProfile::Msfs => "Microsoft Flight Simulator",
            SimProfile::Dcs => "DCS World",
            SimProfile::XPlane => "X-Plane",
            SimProfile::Il2 => "IL-2 Sturmovik",
            SimProfile::WarThunder => "War Thunder",
        }
    }

    /// Next profile, wrapping from the last to the first
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&p| p == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }

    /// Device this profile writes to when the user selected `selected`
    ///
    /// War Thunder binds discrete forward/reverse axes, so it always goes
    /// through the extended joystick.
    pub fn effective_output(self, selected: OutputKind) -> OutputKind {
        match self {
            SimProfile::WarThunder => OutputKind::ExtendedJoystick,
            _ => selected,
        }
    }
}

impl fmt::Display for SimProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Kind of virtual device the quadrant drives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OutputKind {
    /// Xbox-style gamepad (triggers + sticks)
    #[default]
    #[serde(rename = "gamepad", alias = "XBOX")]
    Gamepad,
    /// Many-axis joystick with buttons
    #[serde(rename = "extended_joystick", alias = "VJOY")]
    ExtendedJoystick,
}

impl OutputKind {
    pub fn display_name(&self) -> &'static str {
        match self {
            OutputKind::Gamepad => "Gamepad",
            OutputKind::ExtendedJoystick => "Extended Joystick",
        }
    }
}

impl fmt::Display for OutputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// User-selected mode, changed only by explicit commands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModeState {
    pub profile: SimProfile,
    pub output_kind: OutputKind,
    /// Relabels the prop lever; the numeric law is unchanged
    pub prop_as_speedbrake: bool,
    /// While false nothing is delivered to devices
    pub active: bool,
}

impl Default for ModeState {
    fn default() -> Self {
        Self {
            profile: SimProfile::default(),
            output_kind: OutputKind::default(),
            prop_as_speedbrake: false,
            active: true,
        }
    }
}

impl ModeState {
    pub fn next_profile(&mut self) -> SimProfile {
        self.profile = self.profile.next();
        debug!("Profile changed to {}", self.profile);
        self.profile
    }

    pub fn set_profile(&mut self, profile: SimProfile) {
        self.profile = profile;
    }

    pub fn set_output_kind(&mut self, kind: OutputKind) {
        debug!("Output device set to {}", kind);
        self.output_kind = kind;
    }

    pub fn set_speedbrake(&mut self, enabled: bool) {
        self.prop_as_speedbrake = enabled;
    }

    pub fn pause(&mut self) {
        self.active = false;
    }

    pub fn resume(&mut self) {
        self.active = true;
    }

    /// Flip between active and paused, returning the new state
    pub fn toggle_active(&mut self) -> bool {
        self.active = !self.active;
        self.active
    }

    /// Device the quadrant actually writes to
    pub fn effective_output(&self) -> OutputKind {
        self.profile.effective_output(self.output_kind)
    }
}
