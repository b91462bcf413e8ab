//! Owns the mode, quadrant and panel state for one running bridge

use crate::calibration::ThrottleSample;
use crate::error::{ConfigError, OutputError};
use crate::mapper::{Binding, ProfileMapper};
use crate::output::{CommandBatch, OutputSink};
use crate::panel::{ControlPanel, PanelFrame};
use crate::profile::{ModeState, OutputKind, SimProfile};
use crate::quadrant::{ThrottleFrame, ThrottleQuadrant};
use crate::settings::Settings;
use tracing::{debug, info};

#[derive(Debug, Clone, Default)]
pub struct Engine {
    pub mode: ModeState,
    pub quadrant: ThrottleQuadrant,
    pub panel: ControlPanel,
}

impl Engine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an engine from saved settings, rejecting inconsistent input
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        settings.validate()?;
        let quadrant = ThrottleQuadrant::new(settings.calibration)?;
        let mut panel = ControlPanel::from_channels(&settings.channels)?;
        panel.restore_toggles(&settings.toggle_states)?;
        Ok(Self {
            mode: settings.mode(),
            quadrant,
            panel,
        })
    }

    /// Snapshot everything worth persisting
    pub fn to_settings(&self) -> Settings {
        Settings {
            profile: self.mode.profile,
            output_kind: self.mode.output_kind,
            prop_as_speedbrake: self.mode.prop_as_speedbrake,
            controls_active: self.mode.active,
            calibration: *self.quadrant.calibration(),
            channels: self.panel.channels().to_vec(),
            toggle_states: self.panel.export_toggles(),
        }
    }

    pub fn process_throttle<S: OutputSink + ?Sized>(
        &mut self,
        sample: ThrottleSample,
        sink: &mut S,
    ) -> ThrottleFrame {
        self.quadrant.process(sample, &self.mode, sink)
    }

    pub fn process_panel<S: OutputSink + ?Sized>(
        &mut self,
        raw: &[f64],
        sink: &mut S,
    ) -> PanelFrame {
        self.panel.process(raw, &self.mode, sink)
    }

    pub fn mapper(&self) -> ProfileMapper {
        ProfileMapper::for_mode(&self.mode)
    }

    /// Binding summary for the current profile and device
    pub fn bindings(&self) -> Vec<Binding> {
        self.mapper().bindings(self.mode.profile, self.mode.output_kind)
    }

    pub fn next_profile(&mut self) -> SimProfile {
        let profile = self.mode.next_profile();
        info!("Profile: {}", profile);
        profile
    }

    pub fn set_output_kind(&mut self, kind: OutputKind) {
        self.mode.set_output_kind(kind);
    }

    pub fn set_speedbrake(&mut self, enabled: bool) {
        self.mode.set_speedbrake(enabled);
    }

    /// Pause and return the quadrant's device controls to rest
    ///
    /// The neutral batch bypasses the pause so the simulator does not hold
    /// the last lever positions.
    pub fn pause<S: OutputSink + ?Sized>(&mut self, sink: &mut S) -> Result<(), OutputError> {
        let neutral = self.neutral();
        self.mode.pause();
        info!("Controls paused");
        neutral.deliver(sink)
    }

    pub fn resume(&mut self) {
        self.mode.resume();
        info!("Controls active");
    }

    /// Neutral batch for the current profile and device
    pub fn neutral(&self) -> CommandBatch {
        ProfileMapper::neutral(self.mode.profile, self.mode.output_kind)
    }

    pub fn reset_toggles(&mut self) {
        debug!("Resetting panel toggle states");
        self.panel.reset_toggles();
    }
}
