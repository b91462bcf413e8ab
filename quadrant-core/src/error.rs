//! Engine error types

use crate::profile::OutputKind;
use thiserror::Error;

/// Configuration consistency errors
///
/// Sample values never produce errors; only setters and settings import can
/// reject input.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("Channel index {0} out of range (panel has {max} channels)", max = crate::channel::CHANNEL_COUNT)]
    ChannelIndex(usize),

    #[error("Threshold {0} outside 0-100")]
    Threshold(f64),

    #[error("Button id must be 1-{max}, got {0}", max = crate::channel::MAX_BUTTON_ID)]
    ButtonId(u16),

    #[error("Too many channels in settings: {0}")]
    ChannelCount(usize),

    #[error("Calibration bound for {field} is not a finite number")]
    NonFinite { field: &'static str },
}

/// Errors from delivering a command batch to an output sink
#[derive(Error, Debug)]
pub enum OutputError {
    /// The device the batch targets is not present; nothing was written
    #[error("Output device unavailable: {0}")]
    SinkUnavailable(OutputKind),

    /// The sink cannot express this command (e.g. a stick on a joystick)
    #[error("Unsupported command for this sink: {0}")]
    Unsupported(String),

    /// Controls are paused; nothing was written
    #[error("Controls paused")]
    Paused,

    /// Device write failed
    #[error("Device write failed: {0}")]
    Device(#[from] std::io::Error),
}

impl OutputError {
    /// Whether the batch was skipped rather than failed part-way
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::SinkUnavailable(_) | Self::Paused)
    }
}
