//! Throttle-style axis calibration
//!
//! Converts raw samples into 0-100 percentages using per-control
//! min/idle/max bounds. Two laws are supported:
//!
//! - `SimpleRatio`: 0 at or below idle, 100 at max (prop, mixture)
//! - `IdleSplit`: one raw sample yields a forward reading keyed off
//!   `{idle, max}` and a reverse reading keyed off `{min, idle}`

use serde::{Deserialize, Serialize};
use tracing::debug;

/// Upper bound of every calibrated reading
pub const PERCENT_MAX: f64 = 100.0;

/// Calibration bounds for one logical control
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationProfile {
    /// Full-reverse position (only used by the reverse half of `IdleSplit`)
    #[serde(default)]
    pub min: f64,
    /// Zero-output position
    #[serde(default)]
    pub idle: f64,
    /// Full-output position
    #[serde(default = "default_max")]
    pub max: f64,
    /// Applied last, as `100 - value`
    #[serde(default, alias = "inversion")]
    pub invert: bool,
}

fn default_max() -> f64 {
    PERCENT_MAX
}

impl Default for CalibrationProfile {
    fn default() -> Self {
        Self {
            min: 0.0,
            idle: 0.0,
            max: default_max(),
            invert: false,
        }
    }
}

impl CalibrationProfile {
    pub fn new(min: f64, idle: f64, max: f64) -> Self {
        Self {
            min,
            idle,
            max,
            invert: false,
        }
    }

    pub fn inverted(mut self, invert: bool) -> Self {
        self.invert = invert;
        self
    }

    fn bounds_finite(&self) -> bool {
        self.min.is_finite() && self.idle.is_finite() && self.max.is_finite()
    }
}

/// Which calibration law to apply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CalibrationLaw {
    IdleSplit,
    SimpleRatio,
}

/// Forward and reverse readings derived from one raw sample
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SplitReading {
    pub forward: f64,
    pub reverse: f64,
}

/// Result of [`calibrate`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    Ratio(f64),
    Split(SplitReading),
}

/// Calibrate one raw sample under the given law
pub fn calibrate(raw: f64, profile: &CalibrationProfile, law: CalibrationLaw) -> Reading {
    match law {
        CalibrationLaw::SimpleRatio => Reading::Ratio(ratio(raw, profile)),
        CalibrationLaw::IdleSplit => Reading::Split(split(raw, profile)),
    }
}

/// `SimpleRatio` law: 0 at or below idle, linear to 100 at max
///
/// `max == idle` yields 100 for any sample above idle.
pub fn ratio(raw: f64, profile: &CalibrationProfile) -> f64 {
    let raw = or_idle(raw, profile);
    apply_invert(forward_percent(raw, profile.idle, profile.max), profile.invert)
}

/// `IdleSplit` law: forward above idle, reverse below idle
///
/// Inversion applies to both halves independently.
pub fn split(raw: f64, profile: &CalibrationProfile) -> SplitReading {
    let raw = or_idle(raw, profile);
    SplitReading {
        forward: apply_invert(forward_percent(raw, profile.idle, profile.max), profile.invert),
        reverse: apply_invert(reverse_percent(raw, profile.min, profile.idle), profile.invert),
    }
}

/// NaN samples read as the idle position
fn or_idle(raw: f64, profile: &CalibrationProfile) -> f64 {
    if raw.is_nan() {
        profile.idle
    } else {
        raw
    }
}

fn forward_percent(raw: f64, idle: f64, max: f64) -> f64 {
    if raw <= idle {
        return 0.0;
    }
    if max == idle {
        return PERCENT_MAX;
    }
    unit((raw - idle) / (max - idle)) * PERCENT_MAX
}

fn reverse_percent(raw: f64, min: f64, idle: f64) -> f64 {
    if raw >= idle {
        return 0.0;
    }
    if idle == min {
        return PERCENT_MAX;
    }
    unit((idle - raw) / (idle - min)) * PERCENT_MAX
}

/// Clamp a ratio into [0, 1]; NaN (from non-finite bounds) reads as 0
fn unit(ratio: f64) -> f64 {
    if ratio.is_nan() {
        0.0
    } else {
        ratio.clamp(0.0, 1.0)
    }
}

pub(crate) fn apply_invert(value: f64, invert: bool) -> f64 {
    if invert {
        PERCENT_MAX - value
    } else {
        value
    }
}

/// Logical throttle-quadrant controls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Control {
    Throttle,
    Reverse,
    Prop,
    Mixture,
}

impl Control {
    pub const ALL: &'static [Control] = &[
        Control::Throttle,
        Control::Reverse,
        Control::Prop,
        Control::Mixture,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            Control::Throttle => "Throttle",
            Control::Reverse => "Reverse",
            Control::Prop => "Prop",
            Control::Mixture => "Mixture",
        }
    }
}

/// One raw throttle-quadrant sample (already 0-100 from the hardware)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThrottleSample {
    pub throttle: f64,
    pub prop: f64,
    pub mixture: f64,
}

impl ThrottleSample {
    pub fn new(throttle: f64, prop: f64, mixture: f64) -> Self {
        Self {
            throttle,
            prop,
            mixture,
        }
    }

    /// Raw value feeding a control (throttle and reverse share one lever)
    pub fn raw(&self, control: Control) -> f64 {
        match control {
            Control::Throttle | Control::Reverse => self.throttle,
            Control::Prop => self.prop,
            Control::Mixture => self.mixture,
        }
    }
}

/// Calibrated throttle-quadrant percentages
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ThrottleValues {
    pub forward: f64,
    pub reverse: f64,
    pub prop: f64,
    pub mixture: f64,
}

impl ThrottleValues {
    pub fn new(forward: f64, reverse: f64, prop: f64, mixture: f64) -> Self {
        Self {
            forward,
            reverse,
            prop,
            mixture,
        }
    }

    /// Signed combination used by gamepad mappings, in [-100, 100]
    pub fn net_throttle(&self) -> f64 {
        self.forward - self.reverse
    }
}

/// Calibration for the four quadrant controls
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ThrottleCalibration {
    #[serde(default)]
    pub throttle: CalibrationProfile,
    #[serde(default)]
    pub reverse: CalibrationProfile,
    #[serde(default)]
    pub prop: CalibrationProfile,
    #[serde(default)]
    pub mixture: CalibrationProfile,
}

impl ThrottleCalibration {
    pub fn get(&self, control: Control) -> &CalibrationProfile {
        match control {
            Control::Throttle => &self.throttle,
            Control::Reverse => &self.reverse,
            Control::Prop => &self.prop,
            Control::Mixture => &self.mixture,
        }
    }

    pub fn get_mut(&mut self, control: Control) -> &mut CalibrationProfile {
        match control {
            Control::Throttle => &mut self.throttle,
            Control::Reverse => &mut self.reverse,
            Control::Prop => &mut self.prop,
            Control::Mixture => &mut self.mixture,
        }
    }

    /// Calibrate a full quadrant sample
    ///
    /// Forward comes from the throttle profile, reverse from the reverse
    /// profile, both fed by the same lever position.
    pub fn reading(&self, sample: &ThrottleSample) -> ThrottleValues {
        ThrottleValues {
            forward: split(sample.throttle, &self.throttle).forward,
            reverse: split(sample.throttle, &self.reverse).reverse,
            prop: ratio(sample.prop, &self.prop),
            mixture: ratio(sample.mixture, &self.mixture),
        }
    }

    /// Record the zero-output position of a control
    pub fn set_idle(&mut self, control: Control, raw: f64) {
        debug!("{} idle point set to {}", control.display_name(), raw);
        self.get_mut(control).idle = raw;
    }

    /// Record the full-output position of a control
    pub fn set_max(&mut self, control: Control, raw: f64) {
        debug!("{} max set to {}", control.display_name(), raw);
        self.get_mut(control).max = raw;
    }

    pub fn set_min(&mut self, control: Control, raw: f64) {
        debug!("{} min set to {}", control.display_name(), raw);
        self.get_mut(control).min = raw;
    }

    /// Record the full-reverse lever position
    pub fn set_max_reverse(&mut self, raw: f64) {
        self.set_min(Control::Reverse, raw);
    }

    pub fn set_invert(&mut self, control: Control, invert: bool) {
        debug!(
            "{} inversion {}",
            control.display_name(),
            if invert { "enabled" } else { "disabled" }
        );
        self.get_mut(control).invert = invert;
    }

    /// Reset every control to 0-100 with the current positions as idle
    ///
    /// Inversion flags are kept.
    pub fn reset(&mut self, sample: &ThrottleSample) {
        for &control in Control::ALL {
            let profile = self.get_mut(control);
            *profile = CalibrationProfile::new(0.0, sample.raw(control), PERCENT_MAX)
                .inverted(profile.invert);
        }
        debug!("Calibration reset, idle points taken from current positions");
    }

    /// Whether every bound is a finite number
    pub fn is_finite(&self) -> bool {
        Control::ALL.iter().all(|&c| self.get(c).bounds_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lever() -> CalibrationProfile {
        CalibrationProfile::new(0.0, 200.0, 1000.0)
    }

    #[test]
    fn test_split_scenario() {
        let p = lever();
        assert_eq!(
            split(0.0, &p),
            SplitReading {
                forward: 0.0,
                reverse: 100.0
            }
        );
        assert_eq!(
            split(200.0, &p),
            SplitReading {
                forward: 0.0,
                reverse: 0.0
            }
        );
        assert_eq!(
            split(1000.0, &p),
            SplitReading {
                forward: 100.0,
                reverse: 0.0
            }
        );
        let mid = split(600.0, &p);
        assert!((mid.forward - 50.0).abs() < 1e-9);
        assert_eq!(mid.reverse, 0.0);
    }

    #[test]
    fn test_forward_zero_at_or_below_idle() {
        let p = lever();
        for raw in [-50.0, 0.0, 100.0, 199.999, 200.0] {
            assert_eq!(split(raw, &p).forward, 0.0, "raw={raw}");
        }
    }

    #[test]
    fn test_reverse_zero_at_or_above_idle() {
        let p = lever();
        for raw in [200.0, 200.001, 500.0, 1023.0, 5000.0] {
            assert_eq!(split(raw, &p).reverse, 0.0, "raw={raw}");
        }
    }

    #[test]
    fn test_output_always_in_range() {
        let profiles = [
            lever(),
            CalibrationProfile::new(0.0, 0.0, 0.0),
            CalibrationProfile::new(500.0, 200.0, 100.0),
            CalibrationProfile::new(0.0, 200.0, 1000.0).inverted(true),
            CalibrationProfile::new(0.0, 10.0, f64::NAN),
        ];
        let raws = [
            f64::NEG_INFINITY,
            -1e9,
            -1.0,
            0.0,
            512.0,
            1023.0,
            1e9,
            f64::INFINITY,
            f64::NAN,
        ];
        for p in &profiles {
            for &raw in &raws {
                let s = split(raw, p);
                let r = ratio(raw, p);
                for v in [s.forward, s.reverse, r] {
                    assert!((0.0..=100.0).contains(&v), "{p:?} raw={raw} -> {v}");
                }
            }
        }
    }

    #[test]
    fn test_ratio_zero_width_above_idle_is_full() {
        let p = CalibrationProfile::new(0.0, 40.0, 40.0);
        assert_eq!(ratio(40.0, &p), 0.0);
        assert_eq!(ratio(41.0, &p), 100.0);
    }

    #[test]
    fn test_reverse_zero_width_below_idle_is_full() {
        let p = CalibrationProfile::new(30.0, 30.0, 100.0);
        assert_eq!(split(29.0, &p).reverse, 100.0);
    }

    #[test]
    fn test_inversion_applied_last_to_both_halves() {
        let p = lever().inverted(true);
        let s = split(1000.0, &p);
        assert_eq!(s.forward, 0.0);
        assert_eq!(s.reverse, 100.0);
        assert_eq!(ratio(200.0, &p), 100.0);
    }

    #[test]
    fn test_nan_reads_as_idle() {
        let p = lever();
        assert_eq!(split(f64::NAN, &p), SplitReading::default());
        assert_eq!(ratio(f64::NAN, &p), 0.0);
    }

    #[test]
    fn test_calibrate_dispatches_on_law() {
        let p = lever();
        assert_eq!(
            calibrate(600.0, &p, CalibrationLaw::SimpleRatio),
            Reading::Ratio(50.0)
        );
        assert!(matches!(
            calibrate(0.0, &p, CalibrationLaw::IdleSplit),
            Reading::Split(SplitReading { reverse, .. }) if reverse == 100.0
        ));
    }

    #[test]
    fn test_quadrant_reading_uses_separate_profiles() {
        let mut cal = ThrottleCalibration::default();
        cal.set_idle(Control::Throttle, 20.0);
        cal.set_idle(Control::Reverse, 20.0);
        cal.set_max_reverse(0.0);
        cal.set_invert(Control::Reverse, false);

        let values = cal.reading(&ThrottleSample::new(10.0, 50.0, 100.0));
        assert_eq!(values.forward, 0.0);
        assert_eq!(values.reverse, 50.0);
        assert_eq!(values.prop, 50.0);
        assert_eq!(values.mixture, 100.0);
        assert_eq!(values.net_throttle(), -50.0);
    }

    #[test]
    fn test_reset_takes_idle_from_sample_and_keeps_inversion() {
        let mut cal = ThrottleCalibration::default();
        cal.set_invert(Control::Mixture, true);
        cal.set_max(Control::Prop, 80.0);
        cal.reset(&ThrottleSample::new(12.0, 5.0, 7.0));

        assert_eq!(cal.throttle.idle, 12.0);
        assert_eq!(cal.reverse.idle, 12.0);
        assert_eq!(cal.prop, CalibrationProfile::new(0.0, 5.0, 100.0));
        assert_eq!(cal.mixture.idle, 7.0);
        assert!(cal.mixture.invert);
    }
}
