//! Console commands accepted while running
//!
//! One command per line on stdin, e.g. `next`, `idle`, `max prop`,
//! `pot-min 3`, `capture start`. Calibration captures use the last sample
//! seen on the matching telemetry stream.

use crate::cli::{OutputArg, ProfileArg};
use clap::ValueEnum;
use quadrant_core::{
    ConfigError, Control, Engine, OutputKind, OutputSink, SimProfile, CHANNEL_COUNT,
};
use std::io::BufRead;
use std::str::FromStr;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    NextProfile,
    Profile(SimProfile),
    Output(OutputKind),
    Speedbrake(bool),
    Pause,
    Resume,
    /// Current lever position becomes the idle point
    CaptureIdle(Control),
    CaptureMax(Control),
    CaptureMaxReverse,
    ResetCalibration,
    Invert(Control),
    /// Current raw value of a pot (0-based) becomes its calibrated minimum
    PotMin(usize),
    PotMax(usize),
    PotInvert(usize),
    RangeCaptureStart,
    RangeCaptureStop,
    RangeCaptureApply,
    ResetToggles,
    Bindings,
    Status,
    Save,
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum CommandError {
    #[error("Unknown command: {0} (try \"help\")")]
    Unknown(String),
    #[error("Missing argument for {0}")]
    MissingArgument(&'static str),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

pub const HELP: &str = "\
commands:
  next | profile <msfs|dcs|xplane|il2|war-thunder>
  output <gamepad|joystick> | speedbrake <on|off>
  pause | resume
  idle [control] | max [control] | max-reverse | reset-cal | invert <control>
  pot-min <1-7> | pot-max <1-7> | pot-invert <1-7>
  capture <start|stop|apply> | reset-toggles
  bindings | status | save | quit
controls: throttle, reverse, prop, mixture";

fn control(arg: Option<&str>) -> Result<Control, CommandError> {
    match arg.map(str::to_ascii_lowercase).as_deref() {
        None | Some("throttle") => Ok(Control::Throttle),
        Some("reverse") => Ok(Control::Reverse),
        Some("prop") | Some("speedbrake") => Ok(Control::Prop),
        Some("mixture") => Ok(Control::Mixture),
        Some(other) => Err(CommandError::InvalidArgument(other.to_string())),
    }
}

/// 1-based pot number to channel index
fn pot(arg: Option<&str>, name: &'static str) -> Result<usize, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument(name))?;
    match arg.parse::<usize>() {
        Ok(n) if (1..=CHANNEL_COUNT).contains(&n) => Ok(n - 1),
        _ => Err(CommandError::InvalidArgument(arg.to_string())),
    }
}

fn value_enum<T: ValueEnum>(arg: Option<&str>, name: &'static str) -> Result<T, CommandError> {
    let arg = arg.ok_or(CommandError::MissingArgument(name))?;
    T::from_str(arg, true).map_err(|_| CommandError::InvalidArgument(arg.to_string()))
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Err(CommandError::Unknown(String::new()));
        };
        let arg = words.next();
        let cmd = match word.to_ascii_lowercase().as_str() {
            "next" | "n" => Command::NextProfile,
            "profile" => Command::Profile(value_enum::<ProfileArg>(arg, "profile")?.into()),
            "output" => Command::Output(value_enum::<OutputArg>(arg, "output")?.into()),
            "speedbrake" => match arg {
                Some("on") => Command::Speedbrake(true),
                Some("off") => Command::Speedbrake(false),
                Some(other) => return Err(CommandError::InvalidArgument(other.to_string())),
                None => return Err(CommandError::MissingArgument("speedbrake")),
            },
            "pause" | "p" => Command::Pause,
            "resume" | "r" => Command::Resume,
            "idle" => Command::CaptureIdle(control(arg)?),
            "max" => Command::CaptureMax(control(arg)?),
            "max-reverse" => Command::CaptureMaxReverse,
            "reset-cal" => Command::ResetCalibration,
            "invert" => Command::Invert(control(Some(
                arg.ok_or(CommandError::MissingArgument("invert"))?,
            ))?),
            "pot-min" => Command::PotMin(pot(arg, "pot-min")?),
            "pot-max" => Command::PotMax(pot(arg, "pot-max")?),
            "pot-invert" => Command::PotInvert(pot(arg, "pot-invert")?),
            "capture" => match arg {
                Some("start") => Command::RangeCaptureStart,
                Some("stop") => Command::RangeCaptureStop,
                Some("apply") => Command::RangeCaptureApply,
                Some(other) => return Err(CommandError::InvalidArgument(other.to_string())),
                None => return Err(CommandError::MissingArgument("capture")),
            },
            "reset-toggles" => Command::ResetToggles,
            "bindings" | "b" => Command::Bindings,
            "status" | "s" => Command::Status,
            "save" => Command::Save,
            "quit" | "q" | "exit" => Command::Quit,
            _ => return Err(CommandError::Unknown(word.to_string())),
        };
        Ok(cmd)
    }
}

/// What the run loop should do after a command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Continue,
    Save,
    Quit,
}

/// Apply a command to the engine
pub fn execute<S: OutputSink + ?Sized>(
    engine: &mut Engine,
    cmd: Command,
    sink: &mut S,
) -> Result<Outcome, ConfigError> {
    match cmd {
        Command::NextProfile => {
            engine.next_profile();
        }
        Command::Profile(profile) => {
            engine.mode.set_profile(profile);
            info!("Profile: {}", profile);
        }
        Command::Output(kind) => {
            engine.set_output_kind(kind);
            info!("Output: {}", kind);
        }
        Command::Speedbrake(enabled) => {
            engine.set_speedbrake(enabled);
            info!(
                "Prop lever is {}",
                if enabled { "speedbrake/spoilers" } else { "prop" }
            );
        }
        Command::Pause => {
            if let Err(e) = engine.pause(sink) {
                warn!("Could not return controls to rest: {}", e);
            }
        }
        Command::Resume => engine.resume(),
        Command::CaptureIdle(control) => {
            let raw = engine.quadrant.capture_idle(control)?;
            info!("{} idle set to {}", control.display_name(), raw);
        }
        Command::CaptureMax(control) => {
            let raw = engine.quadrant.capture_max(control)?;
            info!("{} max set to {}", control.display_name(), raw);
        }
        Command::CaptureMaxReverse => {
            let raw = engine.quadrant.capture_max_reverse()?;
            info!("Max reverse set to {}", raw);
        }
        Command::ResetCalibration => {
            engine.quadrant.reset_calibration();
            info!("Calibration reset");
        }
        Command::Invert(control) => {
            let cal = engine.quadrant.calibration_mut();
            let invert = !cal.get(control).invert;
            cal.set_invert(control, invert);
            info!(
                "{} inversion {}",
                control.display_name(),
                if invert { "on" } else { "off" }
            );
        }
        Command::PotMin(index) => {
            let raw = engine.panel.capture_min(index)?;
            info!("Pot {} min set to {}", index + 1, raw);
        }
        Command::PotMax(index) => {
            let raw = engine.panel.capture_max(index)?;
            info!("Pot {} max set to {}", index + 1, raw);
        }
        Command::PotInvert(index) => {
            let invert = engine.panel.toggle_invert(index)?;
            info!(
                "Pot {} inversion {}",
                index + 1,
                if invert { "on" } else { "off" }
            );
        }
        Command::RangeCaptureStart => {
            engine.panel.reset_capture();
            engine.panel.start_capture();
            info!("Capturing pot ranges, sweep every pot end to end");
        }
        Command::RangeCaptureStop => {
            engine.panel.stop_capture();
            info!("Range capture stopped");
        }
        Command::RangeCaptureApply => {
            engine.panel.stop_capture();
            engine.panel.apply_capture();
            info!("Captured ranges applied");
        }
        Command::ResetToggles => {
            engine.reset_toggles();
            info!("Toggle states reset");
        }
        Command::Bindings => {
            let mode = &engine.mode;
            info!("{} / {}", mode.profile, mode.effective_output());
            for binding in engine.bindings() {
                info!("  {}", binding);
            }
        }
        Command::Status => log_status(engine),
        Command::Save => return Ok(Outcome::Save),
        Command::Quit => return Ok(Outcome::Quit),
    }
    Ok(Outcome::Continue)
}

/// Read console lines until EOF or until `send` returns false
///
/// Blocking; runs on its own thread so a pending stdin read never holds up
/// the async runtime on shutdown.
pub fn read_console<R: BufRead>(reader: R, mut send: impl FnMut(Command) -> bool) {
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        match line.trim() {
            "" => continue,
            "help" | "?" => println!("{}", HELP),
            line => match line.parse::<Command>() {
                Ok(cmd) => {
                    if !send(cmd) {
                        break;
                    }
                }
                Err(e) => warn!("{}", e),
            },
        }
    }
}

fn log_status(engine: &Engine) {
    let mode = &engine.mode;
    info!(
        "{} via {}{}",
        mode.profile,
        mode.effective_output(),
        if mode.active { "" } else { " (paused)" }
    );
    let values = engine.quadrant.values();
    info!(
        "Forward {:.1}%  Reverse {:.1}%  Prop {:.1}%  Mixture {:.1}%",
        values.forward, values.reverse, values.prop, values.mixture
    );
    for (i, channel) in engine.panel.channels().iter().enumerate() {
        let raw = engine.panel.last_raw()[i];
        info!(
            "  {} [{}] raw {:.0} -> {:.1}",
            channel.name,
            channel.kind.display_name(),
            raw,
            channel.process(raw).value
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use quadrant_core::{NoSink, ThrottleSample};
    use std::io::Cursor;

    fn parse(line: &str) -> Result<Command, CommandError> {
        line.parse()
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse("next"), Ok(Command::NextProfile));
        assert_eq!(
            parse("profile war-thunder"),
            Ok(Command::Profile(SimProfile::WarThunder))
        );
        assert_eq!(
            parse("output JOYSTICK"),
            Ok(Command::Output(OutputKind::ExtendedJoystick))
        );
        assert_eq!(parse("idle"), Ok(Command::CaptureIdle(Control::Throttle)));
        assert_eq!(parse("max mixture"), Ok(Command::CaptureMax(Control::Mixture)));
        assert_eq!(parse("  pot-min 7 "), Ok(Command::PotMin(6)));
        assert_eq!(parse("capture apply"), Ok(Command::RangeCaptureApply));
        assert_eq!(parse("q"), Ok(Command::Quit));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            parse("fly"),
            Err(CommandError::Unknown("fly".to_string()))
        );
        assert_eq!(
            parse("pot-max 8"),
            Err(CommandError::InvalidArgument("8".to_string()))
        );
        assert_eq!(
            parse("invert"),
            Err(CommandError::MissingArgument("invert"))
        );
        assert_eq!(
            parse("profile fs2020"),
            Err(CommandError::InvalidArgument("fs2020".to_string()))
        );
    }

    #[test]
    fn test_execute_capture_and_mode() {
        let mut engine = Engine::new();
        engine.process_throttle(ThrottleSample::new(22.0, 0.0, 0.0), &mut NoSink);

        let outcome = execute(&mut engine, Command::CaptureIdle(Control::Throttle), &mut NoSink);
        assert_eq!(outcome, Ok(Outcome::Continue));
        assert_eq!(engine.quadrant.calibration().throttle.idle, 22.0);

        execute(&mut engine, Command::Invert(Control::Prop), &mut NoSink).unwrap();
        assert!(engine.quadrant.calibration().prop.invert);

        execute(&mut engine, Command::Pause, &mut NoSink).unwrap();
        assert!(!engine.mode.active);
        assert_eq!(
            execute(&mut engine, Command::Save, &mut NoSink),
            Ok(Outcome::Save)
        );
    }

    #[test]
    fn test_execute_pot_commands() {
        let mut engine = Engine::new();
        engine.process_panel(&[10.0, 20.0, 30.0], &mut NoSink);
        execute(&mut engine, Command::PotMin(2), &mut NoSink).unwrap();
        assert_eq!(engine.panel.channels()[2].calibrated_min, 30.0);
        execute(&mut engine, Command::PotInvert(0), &mut NoSink).unwrap();
        assert!(engine.panel.channels()[0].invert);
    }

    #[test]
    fn test_read_console_skips_noise() {
        let input = Cursor::new("\n  next \nfly\nhelp\npot-max 2\n");
        let mut received = Vec::new();
        read_console(input, |cmd| {
            received.push(cmd);
            true
        });
        assert_eq!(received, vec![Command::NextProfile, Command::PotMax(1)]);
    }

    #[test]
    fn test_read_console_stops_when_receiver_gone() {
        let input = Cursor::new("pause\nresume\nquit\n");
        let mut received = Vec::new();
        read_console(input, |cmd| {
            received.push(cmd);
            false
        });
        assert_eq!(received, vec![Command::Pause]);
    }

    #[test]
    fn test_console_thread_finishes_at_eof() {
        let (tx, rx) = std::sync::mpsc::channel();
        let handle = std::thread::spawn(move || {
            read_console(Cursor::new("status\n"), |cmd| tx.send(cmd).is_ok());
        });
        handle.join().unwrap();
        assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![Command::Status]);
    }
}
