//! Simulator profile mapping
//!
//! Routes calibrated quadrant percentages onto gamepad triggers/sticks or
//! extended joystick axes. Each profile is a static routing table, so the
//! binding summary shown to the user and the commands actually produced come
//! from the same data.

use crate::calibration::ThrottleValues;
use crate::output::{
    scale_joystick_axis, scale_stick, scale_trigger, CommandBatch, ControlLabel, JoystickAxis,
    OutputCommand, StickSide, TriggerSide, STICK_MIN,
};
use crate::profile::{ModeState, OutputKind, SimProfile};
use std::fmt;

/// Quadrant value feeding a route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Forward,
    Reverse,
    /// forward - reverse, in [-100, 100]
    NetThrottle,
    Prop,
    Mixture,
}

/// Device control a route writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    JoystickAxis(JoystickAxis),
    /// Right trigger for positive net throttle, left trigger for negative
    TriggerPair,
    Trigger(TriggerSide),
    StickX(StickSide),
    StickY(StickSide),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::JoystickAxis(axis) => write!(f, "Joystick {}-Axis", axis.display_name()),
            Target::TriggerPair => f.write_str("Right/Left Triggers"),
            Target::Trigger(side) => write!(f, "{side:?} Trigger"),
            Target::StickX(side) => write!(f, "{side:?} Stick X"),
            Target::StickY(side) => write!(f, "{side:?} Stick Y"),
        }
    }
}

type Route = (Source, Target);

const JOYSTICK_ROUTES: &[Route] = &[
    (Source::Forward, Target::JoystickAxis(JoystickAxis::X)),
    (Source::Reverse, Target::JoystickAxis(JoystickAxis::RX)),
    (Source::Prop, Target::JoystickAxis(JoystickAxis::Y)),
    (Source::Mixture, Target::JoystickAxis(JoystickAxis::Z)),
];

const MSFS_ROUTES: &[Route] = &[
    (Source::NetThrottle, Target::TriggerPair),
    (Source::Prop, Target::StickY(StickSide::Right)),
    (Source::Mixture, Target::StickY(StickSide::Left)),
];

const DCS_ROUTES: &[Route] = &[
    (Source::Prop, Target::StickX(StickSide::Left)),
    (Source::NetThrottle, Target::StickY(StickSide::Left)),
    (Source::Mixture, Target::StickY(StickSide::Right)),
];

const XPLANE_ROUTES: &[Route] = &[
    (Source::NetThrottle, Target::TriggerPair),
    (Source::Mixture, Target::StickX(StickSide::Right)),
    (Source::Prop, Target::StickY(StickSide::Right)),
];

const IL2_ROUTES: &[Route] = &[
    (Source::Mixture, Target::Trigger(TriggerSide::Left)),
    (Source::Prop, Target::Trigger(TriggerSide::Right)),
    (Source::NetThrottle, Target::StickY(StickSide::Left)),
];

fn routes(profile: SimProfile, kind: OutputKind) -> &'static [Route] {
    match profile.effective_output(kind) {
        OutputKind::ExtendedJoystick => JOYSTICK_ROUTES,
        OutputKind::Gamepad => match profile {
            SimProfile::Msfs => MSFS_ROUTES,
            SimProfile::Dcs => DCS_ROUTES,
            SimProfile::XPlane => XPLANE_ROUTES,
            SimProfile::Il2 => IL2_ROUTES,
            SimProfile::WarThunder => JOYSTICK_ROUTES,
        },
    }
}

/// One line of the binding summary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Binding {
    pub label: ControlLabel,
    pub target: Target,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.target)
    }
}

/// Maps quadrant values to device commands for a profile
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProfileMapper {
    pub prop_as_speedbrake: bool,
}

impl ProfileMapper {
    pub fn new(prop_as_speedbrake: bool) -> Self {
        Self { prop_as_speedbrake }
    }

    pub fn for_mode(mode: &ModeState) -> Self {
        Self::new(mode.prop_as_speedbrake)
    }

    fn label(&self, source: Source) -> ControlLabel {
        match source {
            Source::Forward => ControlLabel::ForwardThrust,
            Source::Reverse => ControlLabel::ReverseThrust,
            Source::NetThrottle => ControlLabel::Throttle,
            Source::Prop if self.prop_as_speedbrake => ControlLabel::Speedbrake,
            Source::Prop => ControlLabel::Prop,
            Source::Mixture => ControlLabel::Mixture,
        }
    }

    /// Compute the device commands for one set of calibrated values
    pub fn map(
        &self,
        values: &ThrottleValues,
        profile: SimProfile,
        kind: OutputKind,
    ) -> CommandBatch {
        let table = routes(profile, kind);

        // Sticks carry both coordinates in one write; unrouted coordinates
        // stay centred.
        let mut sticks = [(0i16, 0i16); 2];
        for &(source, target) in table {
            let value = scale_stick(percent(source, values));
            match target {
                Target::StickX(side) => sticks[side.index()].0 = value,
                Target::StickY(side) => sticks[side.index()].1 = value,
                _ => {}
            }
        }

        let mut batch = CommandBatch::new();
        let mut stick_entries: [Option<usize>; 2] = [None; 2];
        for &(source, target) in table {
            let label = self.label(source);
            match target {
                Target::JoystickAxis(axis) => batch.push(
                    label,
                    OutputCommand::Axis {
                        axis,
                        value: scale_joystick_axis(percent(source, values)),
                    },
                ),
                Target::TriggerPair => {
                    let net = percent(source, values);
                    let (right, left) = if net >= 0.0 {
                        (scale_trigger(net), 0)
                    } else {
                        (0, scale_trigger(-net))
                    };
                    batch.push(
                        label,
                        OutputCommand::Trigger {
                            side: TriggerSide::Right,
                            value: right,
                        },
                    );
                    batch.push(
                        label,
                        OutputCommand::Trigger {
                            side: TriggerSide::Left,
                            value: left,
                        },
                    );
                }
                Target::Trigger(side) => batch.push(
                    label,
                    OutputCommand::Trigger {
                        side,
                        value: scale_trigger(percent(source, values)),
                    },
                ),
                Target::StickX(stick) | Target::StickY(stick) => {
                    match stick_entries[stick.index()] {
                        Some(index) => batch.add_source(index, label),
                        None => {
                            stick_entries[stick.index()] = Some(batch.len());
                            let (x, y) = sticks[stick.index()];
                            batch.push(label, OutputCommand::Stick { stick, x, y });
                        }
                    }
                }
            }
        }
        batch
    }

    /// Map using the profile and device of `mode`
    pub fn map_mode(&self, values: &ThrottleValues, mode: &ModeState) -> CommandBatch {
        self.map(values, mode.profile, mode.output_kind)
    }

    /// Human-readable bindings for a profile/device pair
    pub fn bindings(&self, profile: SimProfile, kind: OutputKind) -> Vec<Binding> {
        routes(profile, kind)
            .iter()
            .map(|&(source, target)| Binding {
                label: self.label(source),
                target,
            })
            .collect()
    }

    /// Commands that return the quadrant's device controls to rest
    ///
    /// Gamepad: both triggers released, sticks centred except a coordinate
    /// carrying net throttle, which goes to its zero-thrust end.
    /// Extended joystick: the four quadrant axes at zero.
    pub fn neutral(profile: SimProfile, kind: OutputKind) -> CommandBatch {
        let mut batch = CommandBatch::new();
        match profile.effective_output(kind) {
            OutputKind::Gamepad => {
                for side in [TriggerSide::Left, TriggerSide::Right] {
                    batch.push_unlabeled(OutputCommand::Trigger { side, value: 0 });
                }
                let mut sticks = [(0i16, 0i16); 2];
                for &(source, target) in routes(profile, kind) {
                    match (source, target) {
                        (Source::NetThrottle, Target::StickX(side)) => {
                            sticks[side.index()].0 = STICK_MIN
                        }
                        (Source::NetThrottle, Target::StickY(side)) => {
                            sticks[side.index()].1 = STICK_MIN
                        }
                        _ => {}
                    }
                }
                for stick in [StickSide::Left, StickSide::Right] {
                    let (x, y) = sticks[stick.index()];
                    batch.push_unlabeled(OutputCommand::Stick { stick, x, y });
                }
            }
            OutputKind::ExtendedJoystick => {
                for &(_, target) in JOYSTICK_ROUTES {
                    if let Target::JoystickAxis(axis) = target {
                        batch.push_unlabeled(OutputCommand::Axis { axis, value: 0 });
                    }
                }
            }
        }
        batch
    }
}

fn percent(source: Source, values: &ThrottleValues) -> f64 {
    match source {
        Source::Forward => values.forward,
        Source::Reverse => values.reverse,
        Source::NetThrottle => values.net_throttle(),
        Source::Prop => values.prop,
        Source::Mixture => values.mixture,
    }
}
