//! Throttle quadrant bridge
//!
//! Reads serial telemetry from a throttle quadrant and a pot panel, feeds it
//! through the `quadrant_core` engine and writes the result to uinput
//! virtual devices.

pub mod cli;
pub mod commands;
pub mod config;
pub mod log_sink;
pub mod telemetry;
pub mod virtual_device;

pub use log_sink::LogSink;
pub use virtual_device::{DeviceError, UinputSink, VirtualGamepad, VirtualJoystick};
