//! Output sink that logs device writes instead of performing them

use quadrant_core::{
    JoystickAxis, OutputCommand, OutputError, OutputKind, OutputSink, StickSide, TriggerSide,
};
use tracing::info;

/// Dry-run sink: every device is available, each flush logs one line
#[derive(Debug, Default)]
pub struct LogSink {
    pending: Vec<OutputCommand>,
    frames: usize,
}

impl LogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of flushed frames so far
    pub fn frames(&self) -> usize {
        self.frames
    }
}

impl OutputSink for LogSink {
    fn is_available(&self, _device: OutputKind) -> bool {
        true
    }

    fn set_axis(&mut self, axis: JoystickAxis, value: i32) -> Result<(), OutputError> {
        self.pending.push(OutputCommand::Axis { axis, value });
        Ok(())
    }

    fn set_trigger(&mut self, side: TriggerSide, value: u8) -> Result<(), OutputError> {
        self.pending.push(OutputCommand::Trigger { side, value });
        Ok(())
    }

    fn set_stick(&mut self, stick: StickSide, x: i16, y: i16) -> Result<(), OutputError> {
        self.pending.push(OutputCommand::Stick { stick, x, y });
        Ok(())
    }

    fn set_button(&mut self, id: u16, pressed: bool) -> Result<(), OutputError> {
        self.pending.push(OutputCommand::Button { id, pressed });
        Ok(())
    }

    fn flush(&mut self) -> Result<(), OutputError> {
        if self.pending.is_empty() {
            return Ok(());
        }
        let line = self
            .pending
            .drain(..)
            .map(|cmd| cmd.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        self.frames += 1;
        info!("[dry-run] {}", line);
        Ok(())
    }
}
