//! Throttle quadrant pipeline: calibrate a sample, map it, deliver it

use crate::calibration::{Control, ThrottleCalibration, ThrottleSample, ThrottleValues};
use crate::error::{ConfigError, OutputError};
use crate::mapper::ProfileMapper;
use crate::output::{CommandBatch, OutputSink};
use crate::profile::ModeState;

/// Output of one quadrant sample
#[derive(Debug)]
pub struct ThrottleFrame {
    pub values: ThrottleValues,
    pub batch: CommandBatch,
    pub delivery: Result<(), OutputError>,
}

/// Calibration plus the most recent raw sample, which capture actions use
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThrottleQuadrant {
    calibration: ThrottleCalibration,
    last_sample: ThrottleSample,
}

impl ThrottleQuadrant {
    pub fn new(calibration: ThrottleCalibration) -> Result<Self, ConfigError> {
        if !calibration.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "calibration",
            });
        }
        Ok(Self {
            calibration,
            last_sample: ThrottleSample::default(),
        })
    }

    pub fn calibration(&self) -> &ThrottleCalibration {
        &self.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut ThrottleCalibration {
        &mut self.calibration
    }

    pub fn last_sample(&self) -> &ThrottleSample {
        &self.last_sample
    }

    /// Calibrated values for the most recent sample
    pub fn values(&self) -> ThrottleValues {
        self.calibration.reading(&self.last_sample)
    }

    /// Calibrate and map one sample
    ///
    /// The sample is always recorded so capture actions see the current
    /// lever positions, even while paused.
    pub fn process<S: OutputSink + ?Sized>(
        &mut self,
        sample: ThrottleSample,
        mode: &ModeState,
        sink: &mut S,
    ) -> ThrottleFrame {
        self.last_sample = sample;
        let values = self.calibration.reading(&sample);
        let batch = ProfileMapper::for_mode(mode).map_mode(&values, mode);
        let delivery = if mode.active {
            batch.deliver(sink)
        } else {
            Err(OutputError::Paused)
        };
        ThrottleFrame {
            values,
            batch,
            delivery,
        }
    }

    // --- Capture from the last sample ---

    /// Take the current position of `control` as its idle point
    ///
    /// Throttle and reverse share the lever, so both idle points move.
    pub fn capture_idle(&mut self, control: Control) -> Result<f64, ConfigError> {
        let raw = self.current(control)?;
        match control {
            Control::Throttle | Control::Reverse => {
                self.calibration.set_idle(Control::Throttle, raw);
                self.calibration.set_idle(Control::Reverse, raw);
            }
            Control::Prop | Control::Mixture => self.calibration.set_idle(control, raw),
        }
        Ok(raw)
    }

    /// Take the current position of `control` as its full-output point
    pub fn capture_max(&mut self, control: Control) -> Result<f64, ConfigError> {
        let raw = self.current(control)?;
        self.calibration.set_max(control, raw);
        Ok(raw)
    }

    /// Take the current lever position as full reverse
    pub fn capture_max_reverse(&mut self) -> Result<f64, ConfigError> {
        let raw = self.current(Control::Reverse)?;
        self.calibration.set_max_reverse(raw);
        Ok(raw)
    }

    pub fn reset_calibration(&mut self) {
        self.calibration.reset(&self.last_sample);
    }

    fn current(&self, control: Control) -> Result<f64, ConfigError> {
        let raw = self.last_sample.raw(control);
        if raw.is_finite() {
            Ok(raw)
        } else {
            Err(ConfigError::NonFinite {
                field: control.display_name(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::CalibrationProfile;
    use crate::output::testing::RecordingSink;
    use crate::output::{ControlLabel, JoystickAxis, OutputCommand, TriggerSide};
    use crate::profile::{OutputKind, SimProfile};

    fn quadrant() -> ThrottleQuadrant {
        let lever = CalibrationProfile::new(0.0, 20.0, 100.0);
        ThrottleQuadrant::new(ThrottleCalibration {
            throttle: lever,
            reverse: lever,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_process_msfs() {
        let mut q = quadrant();
        let mut sink = RecordingSink::both();
        let frame = q.process(
            ThrottleSample::new(84.0, 0.0, 0.0),
            &ModeState::default(),
            &mut sink,
        );
        frame.delivery.unwrap();
        assert_eq!(frame.values.forward, 80.0);
        assert_eq!(
            frame.batch.find(ControlLabel::Throttle),
            Some(&OutputCommand::Trigger {
                side: TriggerSide::Right,
                value: 204
            })
        );
        assert_eq!(sink.flushes, 1);
    }

    #[test]
    fn test_process_paused_records_sample() {
        let mut q = quadrant();
        let mut mode = ModeState::default();
        mode.pause();
        let mut sink = RecordingSink::both();
        let frame = q.process(ThrottleSample::new(10.0, 30.0, 40.0), &mode, &mut sink);
        assert!(matches!(frame.delivery, Err(OutputError::Paused)));
        assert!(sink.writes.is_empty());
        assert_eq!(frame.values.reverse, 50.0);
        assert_eq!(q.last_sample().prop, 30.0);
    }

    #[test]
    fn test_joystick_output() {
        let mut q = quadrant();
        let mode = ModeState {
            profile: SimProfile::WarThunder,
            ..Default::default()
        };
        let mut sink = RecordingSink::both();
        q.process(ThrottleSample::new(100.0, 50.0, 0.0), &mode, &mut sink)
            .delivery
            .unwrap();
        assert_eq!(
            sink.writes,
            vec![
                OutputCommand::Axis {
                    axis: JoystickAxis::X,
                    value: 32768
                },
                OutputCommand::Axis {
                    axis: JoystickAxis::RX,
                    value: 0
                },
                OutputCommand::Axis {
                    axis: JoystickAxis::Y,
                    value: 16384
                },
                OutputCommand::Axis {
                    axis: JoystickAxis::Z,
                    value: 0
                },
            ]
        );
        assert_eq!(mode.effective_output(), OutputKind::ExtendedJoystick);
    }

    #[test]
    fn test_capture_actions() {
        let mut q = ThrottleQuadrant::default();
        let mut sink = RecordingSink::both();
        let mode = ModeState::default();

        q.process(ThrottleSample::new(15.0, 5.0, 8.0), &mode, &mut sink);
        assert_eq!(q.capture_idle(Control::Throttle).unwrap(), 15.0);
        assert_eq!(q.calibration().reverse.idle, 15.0);
        q.capture_idle(Control::Prop).unwrap();
        assert_eq!(q.calibration().prop.idle, 5.0);
        assert_eq!(q.calibration().mixture.idle, 0.0);

        q.process(ThrottleSample::new(95.0, 90.0, 99.0), &mode, &mut sink);
        q.capture_max(Control::Throttle).unwrap();
        q.capture_max(Control::Mixture).unwrap();
        assert_eq!(q.calibration().throttle.max, 95.0);
        assert_eq!(q.calibration().mixture.max, 99.0);

        q.process(ThrottleSample::new(2.0, 90.0, 99.0), &mode, &mut sink);
        q.capture_max_reverse().unwrap();
        assert_eq!(q.calibration().reverse.min, 2.0);
        assert_eq!(q.values().reverse, 100.0);
        assert_eq!(q.values().forward, 0.0);
    }

    #[test]
    fn test_capture_rejects_nan_position() {
        let mut q = ThrottleQuadrant::default();
        q.process(
            ThrottleSample::new(f64::NAN, 0.0, 0.0),
            &ModeState::default(),
            &mut RecordingSink::both(),
        );
        assert!(q.capture_idle(Control::Throttle).is_err());
        assert_eq!(q.calibration().throttle.idle, 0.0);
    }

    #[test]
    fn test_reset_calibration_uses_last_sample() {
        let mut q = quadrant();
        q.calibration_mut().set_invert(Control::Mixture, true);
        q.process(
            ThrottleSample::new(12.0, 7.0, 3.0),
            &ModeState::default(),
            &mut RecordingSink::both(),
        );
        q.reset_calibration();
        let cal = q.calibration();
        assert_eq!(cal.throttle, CalibrationProfile::new(0.0, 12.0, 100.0));
        assert_eq!(cal.reverse.idle, 12.0);
        assert_eq!(cal.prop.idle, 7.0);
        assert!(cal.mixture.invert);
    }

    #[test]
    fn test_rejects_non_finite_calibration() {
        let cal = ThrottleCalibration {
            prop: CalibrationProfile::new(0.0, f64::NAN, 100.0),
            ..Default::default()
        };
        assert!(ThrottleQuadrant::new(cal).is_err());
    }
}
