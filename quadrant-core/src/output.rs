//! Device output commands and the sink contract
//!
//! The engine never talks to a device directly. Everything computed from one
//! input sample is collected into a [`CommandBatch`] which is applied to an
//! [`OutputSink`] and then flushed exactly once.

use crate::error::OutputError;
use crate::profile::OutputKind;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Extended joystick axis full scale (0x8000)
pub const JOYSTICK_AXIS_MAX: i32 = 32768;

/// Gamepad trigger full scale
pub const TRIGGER_MAX: u8 = 255;

/// Gamepad stick signed range
pub const STICK_MIN: i16 = i16::MIN;
pub const STICK_MAX: i16 = i16::MAX;
const STICK_FULL_SCALE: f64 = 65535.0;

/// Extended joystick axis identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum JoystickAxis {
    X,
    Y,
    Z,
    RX,
    RY,
    RZ,
    #[serde(rename = "SL0", alias = "Slider0")]
    Slider0,
    #[serde(rename = "SL1", alias = "Slider1")]
    Slider1,
}

impl JoystickAxis {
    pub const ALL: &'static [JoystickAxis] = &[
        JoystickAxis::X,
        JoystickAxis::Y,
        JoystickAxis::Z,
        JoystickAxis::RX,
        JoystickAxis::RY,
        JoystickAxis::RZ,
        JoystickAxis::Slider0,
        JoystickAxis::Slider1,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            JoystickAxis::X => "X",
            JoystickAxis::Y => "Y",
            JoystickAxis::Z => "Z",
            JoystickAxis::RX => "RX",
            JoystickAxis::RY => "RY",
            JoystickAxis::RZ => "RZ",
            JoystickAxis::Slider0 => "SL0",
            JoystickAxis::Slider1 => "SL1",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TriggerSide {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StickSide {
    Left,
    Right,
}

impl StickSide {
    pub(crate) fn index(self) -> usize {
        match self {
            StickSide::Left => 0,
            StickSide::Right => 1,
        }
    }
}

/// One device write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCommand {
    /// Extended joystick axis, `0..=JOYSTICK_AXIS_MAX`
    Axis { axis: JoystickAxis, value: i32 },
    /// Gamepad trigger, `0..=TRIGGER_MAX`
    Trigger { side: TriggerSide, value: u8 },
    /// Gamepad stick position
    Stick { stick: StickSide, x: i16, y: i16 },
    /// Extended joystick button, 1-based
    Button { id: u16, pressed: bool },
}

impl OutputCommand {
    /// Device that can execute this command
    pub fn device(&self) -> OutputKind {
        match self {
            OutputCommand::Axis { .. } | OutputCommand::Button { .. } => {
                OutputKind::ExtendedJoystick
            }
            OutputCommand::Trigger { .. } | OutputCommand::Stick { .. } => OutputKind::Gamepad,
        }
    }
}

impl fmt::Display for OutputCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputCommand::Axis { axis, value } => write!(f, "axis {} = {value}", axis.display_name()),
            OutputCommand::Trigger { side, value } => write!(f, "{side:?} trigger = {value}"),
            OutputCommand::Stick { stick, x, y } => write!(f, "{stick:?} stick = ({x}, {y})"),
            OutputCommand::Button { id, pressed } => {
                write!(f, "button {id} {}", if *pressed { "down" } else { "up" })
            }
        }
    }
}

/// Semantic source of a command, for display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlLabel {
    ForwardThrust,
    ReverseThrust,
    /// Net throttle (forward - reverse)
    Throttle,
    Prop,
    Speedbrake,
    Mixture,
    /// Auxiliary panel channel by index
    Channel(usize),
}

impl fmt::Display for ControlLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlLabel::ForwardThrust => f.write_str("Forward Thrust"),
            ControlLabel::ReverseThrust => f.write_str("Reverse Thrust"),
            ControlLabel::Throttle => f.write_str("Throttle"),
            ControlLabel::Prop => f.write_str("Prop"),
            ControlLabel::Speedbrake => f.write_str("Speedbrake/Spoilers"),
            ControlLabel::Mixture => f.write_str("Mixture"),
            ControlLabel::Channel(i) => write!(f, "Channel {}", i + 1),
        }
    }
}

/// Scale a percentage onto the extended joystick axis range
pub fn scale_joystick_axis(percent: f64) -> i32 {
    if percent.is_nan() {
        return 0;
    }
    let max = JOYSTICK_AXIS_MAX as f64;
    (percent * max / 100.0).round().clamp(0.0, max) as i32
}

/// Scale a percentage onto the trigger range
pub fn scale_trigger(percent: f64) -> u8 {
    if percent.is_nan() {
        return 0;
    }
    let max = TRIGGER_MAX as f64;
    (percent * max / 100.0).round().clamp(0.0, max) as u8
}

/// Scale a percentage onto the signed stick range, 50% at centre
pub fn scale_stick(percent: f64) -> i16 {
    if percent.is_nan() {
        return 0;
    }
    (percent * STICK_FULL_SCALE / 100.0 - STICK_FULL_SCALE / 2.0)
        .round()
        .clamp(STICK_MIN as f64, STICK_MAX as f64) as i16
}

/// Virtual device contract
///
/// Implementations may buffer writes; nothing needs to be visible on the
/// device until [`OutputSink::flush`].
pub trait OutputSink {
    /// Whether the given device is present and writable
    fn is_available(&self, device: OutputKind) -> bool;

    fn set_axis(&mut self, axis: JoystickAxis, value: i32) -> Result<(), OutputError>;

    fn set_trigger(&mut self, side: TriggerSide, value: u8) -> Result<(), OutputError>;

    fn set_stick(&mut self, stick: StickSide, x: i16, y: i16) -> Result<(), OutputError>;

    fn set_button(&mut self, id: u16, pressed: bool) -> Result<(), OutputError>;

    /// Make all buffered writes visible at once
    fn flush(&mut self) -> Result<(), OutputError>;
}

/// A sink for callers with no device at all
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSink;

impl OutputSink for NoSink {
    fn is_available(&self, _device: OutputKind) -> bool {
        false
    }

    fn set_axis(&mut self, _axis: JoystickAxis, _value: i32) -> Result<(), OutputError> {
        Err(OutputError::SinkUnavailable(OutputKind::ExtendedJoystick))
    }

    fn set_trigger(&mut self, _side: TriggerSide, _value: u8) -> Result<(), OutputError> {
        Err(OutputError::SinkUnavailable(OutputKind::Gamepad))
    }

    fn set_stick(&mut self, _stick: StickSide, _x: i16, _y: i16) -> Result<(), OutputError> {
        Err(OutputError::SinkUnavailable(OutputKind::Gamepad))
    }

    fn set_button(&mut self, _id: u16, _pressed: bool) -> Result<(), OutputError> {
        Err(OutputError::SinkUnavailable(OutputKind::ExtendedJoystick))
    }

    fn flush(&mut self) -> Result<(), OutputError> {
        Ok(())
    }
}

/// A command together with the controls it came from
///
/// A stick write can carry two controls, one per coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabeledCommand {
    /// Empty for synthetic writes such as a neutral reset
    pub sources: Vec<ControlLabel>,
    pub command: OutputCommand,
}

/// Ordered device writes computed from one input sample
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandBatch {
    entries: Vec<LabeledCommand>,
}

impl CommandBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, source: ControlLabel, command: OutputCommand) {
        self.entries.push(LabeledCommand {
            sources: vec![source],
            command,
        });
    }

    pub fn push_unlabeled(&mut self, command: OutputCommand) {
        self.entries.push(LabeledCommand {
            sources: Vec::new(),
            command,
        });
    }

    /// Attach another source to the entry at `index`
    pub(crate) fn add_source(&mut self, index: usize, source: ControlLabel) {
        if let Some(entry) = self.entries.get_mut(index) {
            if !entry.sources.contains(&source) {
                entry.sources.push(source);
            }
        }
    }

    pub fn entries(&self) -> &[LabeledCommand] {
        &self.entries
    }

    pub fn commands(&self) -> impl Iterator<Item = &OutputCommand> + '_ {
        self.entries.iter().map(|e| &e.command)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Command written for a given source, if any
    pub fn find(&self, source: ControlLabel) -> Option<&OutputCommand> {
        self.entries
            .iter()
            .find(|e| e.sources.contains(&source))
            .map(|e| &e.command)
    }

    /// Devices this batch writes to, in first-use order
    pub fn devices(&self) -> Vec<OutputKind> {
        let mut devices = Vec::new();
        for cmd in self.commands() {
            let device = cmd.device();
            if !devices.contains(&device) {
                devices.push(device);
            }
        }
        devices
    }

    /// Apply every command, then flush once
    ///
    /// Availability of every target device is checked before the first
    /// write, so an unavailable device never sees a partial batch.
    pub fn deliver<S: OutputSink + ?Sized>(&self, sink: &mut S) -> Result<(), OutputError> {
        if self.is_empty() {
            return Ok(());
        }
        if let Some(missing) = self
            .devices()
            .into_iter()
            .find(|&device| !sink.is_available(device))
        {
            return Err(OutputError::SinkUnavailable(missing));
        }
        for cmd in self.commands() {
            apply(cmd, sink)?;
        }
        sink.flush()
    }
}

/// Apply one command to a sink without flushing
pub fn apply<S: OutputSink + ?Sized>(cmd: &OutputCommand, sink: &mut S) -> Result<(), OutputError> {
    match *cmd {
        OutputCommand::Axis { axis, value } => sink.set_axis(axis, value),
        OutputCommand::Trigger { side, value } => sink.set_trigger(side, value),
        OutputCommand::Stick { stick, x, y } => sink.set_stick(stick, x, y),
        OutputCommand::Button { id, pressed } => sink.set_button(id, pressed),
    }
}
