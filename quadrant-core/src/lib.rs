//! Throttle quadrant and pot panel engine
//!
//! Calibrates raw throttle-quadrant and control-panel samples, runs the
//! panel toggle logic, and maps the result onto virtual gamepad or extended
//! joystick writes through the [`OutputSink`] contract.

pub mod calibration;
pub mod channel;
pub mod engine;
pub mod error;
pub mod mapper;
pub mod output;
pub mod panel;
pub mod profile;
pub mod quadrant;
pub mod settings;
pub mod toggle;

pub use calibration::{
    CalibrationLaw, CalibrationProfile, Control, ThrottleCalibration, ThrottleSample,
    ThrottleValues,
};
pub use channel::{ChannelConfig, ChannelKind, CHANNEL_COUNT};
pub use engine::Engine;
pub use error::{ConfigError, OutputError};
pub use mapper::{Binding, ProfileMapper, Target};
pub use output::{
    CommandBatch, ControlLabel, JoystickAxis, NoSink, OutputCommand, OutputSink, StickSide,
    TriggerSide,
};
pub use panel::{ControlPanel, PanelFrame};
pub use profile::{ModeState, OutputKind, SimProfile};
pub use quadrant::{ThrottleFrame, ThrottleQuadrant};
pub use settings::Settings;
pub use toggle::{ToggleKey, ToggleMode, ToggleRecord, ToggleStateMachine};
