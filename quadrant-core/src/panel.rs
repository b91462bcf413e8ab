//! Auxiliary control panel pipeline
//!
//! Turns one line of seven raw pot values into display percentages and the
//! extended joystick axis/button writes configured for each channel.

use crate::channel::{
    validate_button_id, validate_threshold, ChannelConfig, ChannelKind, CHANNEL_COUNT, RAW_MAX,
    RAW_MIN,
};
use crate::error::{ConfigError, OutputError};
use crate::output::{
    scale_joystick_axis, CommandBatch, ControlLabel, JoystickAxis, OutputCommand, OutputSink,
};
use crate::profile::ModeState;
use crate::toggle::{ToggleKey, ToggleMode, ToggleRecord, ToggleStateMachine};
use tracing::debug;

/// Records the raw extremes seen on each channel while the user sweeps them
#[derive(Debug, Clone, PartialEq)]
pub struct RangeCapture {
    capturing: bool,
    min: [f64; CHANNEL_COUNT],
    max: [f64; CHANNEL_COUNT],
}

impl Default for RangeCapture {
    fn default() -> Self {
        Self {
            capturing: false,
            min: [RAW_MAX; CHANNEL_COUNT],
            max: [RAW_MIN; CHANNEL_COUNT],
        }
    }
}

impl RangeCapture {
    pub fn is_capturing(&self) -> bool {
        self.capturing
    }

    pub fn start(&mut self) {
        self.capturing = true;
    }

    pub fn stop(&mut self) {
        self.capturing = false;
        debug!("Captured min {:?} max {:?}", self.min, self.max);
    }

    /// Forget captured extremes (capturing state is kept)
    pub fn reset(&mut self) {
        self.min = [RAW_MAX; CHANNEL_COUNT];
        self.max = [RAW_MIN; CHANNEL_COUNT];
    }

    /// Widen the captured extremes with one line of raw values
    pub fn observe(&mut self, raw: &[f64; CHANNEL_COUNT]) {
        if !self.capturing {
            return;
        }
        for (i, &value) in raw.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            self.min[i] = self.min[i].min(value);
            self.max[i] = self.max[i].max(value);
        }
    }

    /// Captured `(min, max)` for a channel, if anything was observed
    pub fn captured(&self, index: usize) -> Option<(f64, f64)> {
        let (min, max) = (*self.min.get(index)?, *self.max.get(index)?);
        (min <= max).then_some((min, max))
    }
}

/// Output of one panel line
#[derive(Debug)]
pub struct PanelFrame {
    /// Display value per channel
    pub values: [f64; CHANNEL_COUNT],
    pub batch: CommandBatch,
    /// Result of delivering `batch`
    pub delivery: Result<(), OutputError>,
}

/// The seven-channel panel with its toggle history
#[derive(Debug, Clone)]
pub struct ControlPanel {
    channels: [ChannelConfig; CHANNEL_COUNT],
    toggles: ToggleStateMachine,
    last_raw: [f64; CHANNEL_COUNT],
    capture: RangeCapture,
}

impl Default for ControlPanel {
    fn default() -> Self {
        Self::new()
    }
}

impl ControlPanel {
    pub fn new() -> Self {
        Self {
            channels: std::array::from_fn(ChannelConfig::new),
            toggles: ToggleStateMachine::new(),
            last_raw: [RAW_MIN; CHANNEL_COUNT],
            capture: RangeCapture::default(),
        }
    }

    /// Build from channel configs; missing channels take defaults
    pub fn from_channels(configs: &[ChannelConfig]) -> Result<Self, ConfigError> {
        if configs.len() > CHANNEL_COUNT {
            return Err(ConfigError::ChannelCount(configs.len()));
        }
        let mut panel = Self::new();
        for (i, config) in configs.iter().enumerate() {
            config.validate()?;
            panel.channels[i] = config.clone();
        }
        panel.sync_toggle_keys();
        Ok(panel)
    }

    pub fn channels(&self) -> &[ChannelConfig] {
        &self.channels
    }

    pub fn channel(&self, index: usize) -> Result<&ChannelConfig, ConfigError> {
        self.channels
            .get(index)
            .ok_or(ConfigError::ChannelIndex(index))
    }

    fn channel_mut(&mut self, index: usize) -> Result<&mut ChannelConfig, ConfigError> {
        self.channels
            .get_mut(index)
            .ok_or(ConfigError::ChannelIndex(index))
    }

    pub fn toggles(&self) -> &ToggleStateMachine {
        &self.toggles
    }

    pub fn last_raw(&self) -> &[f64; CHANNEL_COUNT] {
        &self.last_raw
    }

    pub fn capture(&self) -> &RangeCapture {
        &self.capture
    }

    /// Give every configured discrete channel a toggle entry up front
    fn sync_toggle_keys(&mut self) {
        for (i, config) in self.channels.iter().enumerate() {
            if let (true, Some(button)) = (config.kind.is_discrete(), config.output_button_id) {
                self.toggles.ensure(ToggleKey::new(i, button));
            }
        }
    }

    // --- Setters ---

    pub fn set_name(&mut self, index: usize, name: impl Into<String>) -> Result<(), ConfigError> {
        self.channel_mut(index)?.name = name.into();
        Ok(())
    }

    pub fn set_kind(&mut self, index: usize, kind: ChannelKind) -> Result<(), ConfigError> {
        self.channel_mut(index)?.kind = kind;
        self.sync_toggle_keys();
        Ok(())
    }

    pub fn set_invert(&mut self, index: usize, invert: bool) -> Result<(), ConfigError> {
        self.channel_mut(index)?.invert = invert;
        Ok(())
    }

    pub fn toggle_invert(&mut self, index: usize) -> Result<bool, ConfigError> {
        let channel = self.channel_mut(index)?;
        channel.invert = !channel.invert;
        Ok(channel.invert)
    }

    pub fn set_threshold(&mut self, index: usize, threshold: f64) -> Result<(), ConfigError> {
        validate_threshold(threshold)?;
        self.channel_mut(index)?.threshold = threshold;
        Ok(())
    }

    pub fn set_calibrated_min(&mut self, index: usize, raw: f64) -> Result<(), ConfigError> {
        if !raw.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "calibrated_min",
            });
        }
        self.channel_mut(index)?.calibrated_min = raw;
        Ok(())
    }

    pub fn set_calibrated_max(&mut self, index: usize, raw: f64) -> Result<(), ConfigError> {
        if !raw.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "calibrated_max",
            });
        }
        self.channel_mut(index)?.calibrated_max = raw;
        Ok(())
    }

    /// Use the channel's last raw value as its calibrated minimum
    pub fn capture_min(&mut self, index: usize) -> Result<f64, ConfigError> {
        let raw = *self.last_raw.get(index).ok_or(ConfigError::ChannelIndex(index))?;
        self.set_calibrated_min(index, raw)?;
        Ok(raw)
    }

    /// Use the channel's last raw value as its calibrated maximum
    pub fn capture_max(&mut self, index: usize) -> Result<f64, ConfigError> {
        let raw = *self.last_raw.get(index).ok_or(ConfigError::ChannelIndex(index))?;
        self.set_calibrated_max(index, raw)?;
        Ok(raw)
    }

    pub fn set_output_axis(
        &mut self,
        index: usize,
        axis: Option<JoystickAxis>,
    ) -> Result<(), ConfigError> {
        self.channel_mut(index)?.output_axis = axis;
        Ok(())
    }

    pub fn set_output_button(&mut self, index: usize, button: Option<u16>) -> Result<(), ConfigError> {
        if let Some(id) = button {
            validate_button_id(id)?;
        }
        self.channel_mut(index)?.output_button_id = button;
        self.sync_toggle_keys();
        Ok(())
    }

    // --- Toggle state ---

    pub fn reset_toggles(&mut self) {
        self.toggles.reset();
        self.sync_toggle_keys();
    }

    pub fn export_toggles(&self) -> Vec<ToggleRecord> {
        self.toggles.export()
    }

    pub fn restore_toggles(&mut self, records: &[ToggleRecord]) -> Result<(), ConfigError> {
        for record in records {
            if record.channel >= CHANNEL_COUNT {
                return Err(ConfigError::ChannelIndex(record.channel));
            }
            validate_button_id(record.button)?;
        }
        self.toggles.restore(records);
        Ok(())
    }

    // --- Range capture ---

    pub fn start_capture(&mut self) {
        self.capture.start();
    }

    pub fn stop_capture(&mut self) {
        self.capture.stop();
    }

    pub fn reset_capture(&mut self) {
        self.capture.reset();
    }

    /// Write the captured extremes into each observed channel's range
    pub fn apply_capture(&mut self) {
        for (i, channel) in self.channels.iter_mut().enumerate() {
            if let Some((min, max)) = self.capture.captured(i) {
                channel.calibrated_min = min;
                channel.calibrated_max = max;
            }
        }
        debug!("Applied captured ranges to panel channels");
    }

    // --- Processing ---

    /// Compute display values and device writes for one line of raw values
    ///
    /// Missing channels read as raw 0, extra values are ignored. Toggle
    /// state only advances while `advance_toggles` is set.
    pub fn compute(
        &mut self,
        raw: &[f64],
        advance_toggles: bool,
    ) -> ([f64; CHANNEL_COUNT], CommandBatch) {
        let line: [f64; CHANNEL_COUNT] =
            std::array::from_fn(|i| raw.get(i).copied().unwrap_or(RAW_MIN));
        self.last_raw = line;
        self.capture.observe(&line);

        let mut values = [0.0; CHANNEL_COUNT];
        let mut batch = CommandBatch::new();
        for (i, config) in self.channels.iter().enumerate() {
            let reading = config.process(line[i]);
            values[i] = reading.value;

            match (config.kind, reading.above_threshold) {
                (ChannelKind::Axis, _) => {
                    if let Some(axis) = config.output_axis {
                        batch.push(
                            ControlLabel::Channel(i),
                            OutputCommand::Axis {
                                axis,
                                value: scale_joystick_axis(reading.value),
                            },
                        );
                    }
                }
                (ChannelKind::Switch | ChannelKind::Button, Some(above)) if advance_toggles => {
                    if let Some(button) = config.output_button_id {
                        let mode = if config.kind == ChannelKind::Switch {
                            ToggleMode::Switch
                        } else {
                            ToggleMode::Button
                        };
                        let pressed = self.toggles.update(ToggleKey::new(i, button), above, mode);
                        batch.push(
                            ControlLabel::Channel(i),
                            OutputCommand::Button { id: button, pressed },
                        );
                    }
                }
                _ => {}
            }
        }
        (values, batch)
    }

    /// Process one line and deliver the resulting writes in a single flush
    ///
    /// While controls are paused, values are still computed but neither the
    /// toggle state nor the device changes.
    pub fn process<S: OutputSink + ?Sized>(
        &mut self,
        raw: &[f64],
        mode: &ModeState,
        sink: &mut S,
    ) -> PanelFrame {
        let (values, batch) = self.compute(raw, mode.active);
        let delivery = if mode.active {
            batch.deliver(sink)
        } else {
            Err(OutputError::Paused)
        };
        PanelFrame {
            values,
            batch,
            delivery,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::testing::RecordingSink;
    use crate::output::NoSink;
    use crate::profile::OutputKind;

    fn panel_with_switch(kind: ChannelKind) -> ControlPanel {
        let mut panel = ControlPanel::new();
        panel.set_kind(1, kind).unwrap();
        panel.set_output_button(1, Some(5)).unwrap();
        panel
    }

    fn line(ch1: f64) -> [f64; CHANNEL_COUNT] {
        let mut raw = [0.0; CHANNEL_COUNT];
        raw[1] = ch1;
        raw
    }

    #[test]
    fn test_switch_trace() {
        let mut panel = panel_with_switch(ChannelKind::Switch);
        let mode = ModeState::default();
        let mut sink = RecordingSink::both();

        let mut displayed = Vec::new();
        let mut pressed = Vec::new();
        for raw in [0.0, 600.0, 0.0, 600.0] {
            let frame = panel.process(&line(raw), &mode, &mut sink);
            frame.delivery.unwrap();
            displayed.push(frame.values[1]);
            pressed.push(frame.batch.find(ControlLabel::Channel(1)).copied());
        }
        assert_eq!(displayed, vec![0.0, 100.0, 0.0, 100.0]);
        let states: Vec<bool> = pressed
            .into_iter()
            .map(|c| match c {
                Some(OutputCommand::Button { id: 5, pressed }) => pressed,
                other => panic!("unexpected {other:?}"),
            })
            .collect();
        assert_eq!(states, vec![false, true, true, false]);
        assert_eq!(sink.flushes, 4);
    }

    #[test]
    fn test_axis_channel_writes_configured_axis() {
        let mut panel = ControlPanel::new();
        panel.set_output_axis(0, Some(JoystickAxis::Slider0)).unwrap();
        let mut sink = RecordingSink::both();
        let frame = panel.process(&[1023.0], &ModeState::default(), &mut sink);
        assert_eq!(frame.values[0], 100.0);
        assert_eq!(
            sink.writes,
            vec![OutputCommand::Axis {
                axis: JoystickAxis::Slider0,
                value: 32768
            }]
        );
    }

    #[test]
    fn test_unmapped_and_disabled_channels_write_nothing() {
        let mut panel = ControlPanel::new();
        panel.set_kind(2, ChannelKind::Disabled).unwrap();
        panel.set_output_axis(2, Some(JoystickAxis::Z)).unwrap();
        panel.set_kind(3, ChannelKind::Button).unwrap();
        let (values, batch) = panel.compute(&[500.0; 9], true);
        assert_eq!(values[2], 0.0);
        assert_eq!(values[3], 0.0);
        assert!(batch.is_empty());
    }

    #[test]
    fn test_short_line_pads_with_zero() {
        let mut panel = ControlPanel::new();
        let (values, _) = panel.compute(&[1023.0, 1023.0], true);
        assert_eq!(values[0], 100.0);
        assert_eq!(values[6], 0.0);
        assert_eq!(panel.last_raw()[6], 0.0);
    }

    #[test]
    fn test_paused_does_not_advance_toggles() {
        let mut panel = panel_with_switch(ChannelKind::Switch);
        let mut mode = ModeState::default();
        mode.pause();
        let mut sink = RecordingSink::both();
        let frame = panel.process(&line(900.0), &mode, &mut sink);
        assert!(matches!(frame.delivery, Err(OutputError::Paused)));
        assert_eq!(frame.values[1], 100.0);
        assert!(sink.writes.is_empty());

        mode.resume();
        let frame = panel.process(&line(900.0), &mode, &mut sink);
        assert_eq!(
            frame.batch.find(ControlLabel::Channel(1)),
            Some(&OutputCommand::Button {
                id: 5,
                pressed: true
            })
        );
    }

    #[test]
    fn test_unavailable_sink_still_computes() {
        let mut panel = panel_with_switch(ChannelKind::Button);
        let frame = panel.process(&line(900.0), &ModeState::default(), &mut NoSink);
        assert!(matches!(
            frame.delivery,
            Err(OutputError::SinkUnavailable(OutputKind::ExtendedJoystick))
        ));
        assert_eq!(frame.values[1], 100.0);
        assert_eq!(frame.batch.len(), 1);
    }

    #[test]
    fn test_reassigning_button_starts_fresh_history() {
        let mut panel = panel_with_switch(ChannelKind::Switch);
        panel.compute(&line(900.0), true);
        assert!(panel.toggles().get(ToggleKey::new(1, 5)).unwrap().current_button_state);

        panel.set_output_button(1, Some(6)).unwrap();
        assert_eq!(
            panel.toggles().get(ToggleKey::new(1, 6)),
            Some(&Default::default())
        );
        let (_, batch) = panel.compute(&line(900.0), true);
        assert_eq!(
            batch.find(ControlLabel::Channel(1)),
            Some(&OutputCommand::Button {
                id: 6,
                pressed: true
            })
        );
    }

    #[test]
    fn test_setter_validation() {
        let mut panel = ControlPanel::new();
        assert_eq!(
            panel.set_threshold(7, 10.0),
            Err(ConfigError::ChannelIndex(7))
        );
        assert_eq!(
            panel.set_threshold(0, -1.0),
            Err(ConfigError::Threshold(-1.0))
        );
        assert_eq!(
            panel.set_output_button(0, Some(129)),
            Err(ConfigError::ButtonId(129))
        );
        assert!(panel.toggle_invert(0).unwrap());
        assert!(!panel.toggle_invert(0).unwrap());
        panel.set_name(3, "Flaps").unwrap();
        assert_eq!(panel.channel(3).unwrap().name, "Flaps");
    }

    #[test]
    fn test_capture_min_max_from_last_raw() {
        let mut panel = ControlPanel::new();
        panel.compute(&[120.0], true);
        assert_eq!(panel.capture_min(0).unwrap(), 120.0);
        panel.compute(&[880.0], true);
        assert_eq!(panel.capture_max(0).unwrap(), 880.0);
        assert_eq!(panel.channel(0).unwrap().effective_range(), (120.0, 880.0));
    }

    #[test]
    fn test_range_capture_applies_observed_extremes() {
        let mut panel = ControlPanel::new();
        panel.compute(&[5.0, 5.0], true);
        panel.start_capture();
        assert!(panel.capture().is_capturing());
        for raw in [[200.0, 400.0], [800.0, 300.0], [500.0, 350.0]] {
            panel.compute(&raw, true);
        }
        panel.stop_capture();
        panel.compute(&[0.0, 0.0], true);
        panel.apply_capture();

        assert_eq!(panel.channel(0).unwrap().effective_range(), (200.0, 800.0));
        assert_eq!(panel.channel(1).unwrap().effective_range(), (300.0, 400.0));
        // Channels 2.. were observed at raw 0 only
        assert_eq!(panel.channel(2).unwrap().calibrated_max, 0.0);
        assert_eq!(panel.channel(2).unwrap().effective_range(), (0.0, 1023.0));
    }

    #[test]
    fn test_from_channels_rejects_too_many() {
        let configs: Vec<_> = (0..8).map(ChannelConfig::new).collect();
        assert_eq!(
            ControlPanel::from_channels(&configs).err(),
            Some(ConfigError::ChannelCount(8))
        );
    }
}
