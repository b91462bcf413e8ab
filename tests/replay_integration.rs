//! Integration tests replaying recorded telemetry.
//!
//! These feed captured serial lines through the parsers and the engine the
//! same way the run loop does, without needing uinput or a serial port.

use quadrant_bridge::commands::{execute, Command, Outcome};
use quadrant_bridge::config::{self, FileFormat};
use quadrant_bridge::telemetry::{parse_panel_line, parse_throttle_line, TelemetryError};
use quadrant_bridge::LogSink;
use quadrant_core::{
    ChannelKind, ControlLabel, Engine, JoystickAxis, OutputCommand, SimProfile, TriggerSide,
};

const THROTTLE_CAPTURE: &str = "\
512,20.0,0,0.0,0,0.0
600,30.0,0,0.0,0,0.0
garbage
1023,100.0,512,50.0,1023,100.0
5.0,0.0,0.0
";

const PANEL_CAPTURE: &str = "\
booting panel v2
CTRLPANEL,0,0.0,512,50.0,0,0.0,0,0.0,0,0.0,0,0.0,0,0.0
CTRLPANEL,0,0.0,512,50.0,900,88.0,0,0.0,0,0.0,0,0.0,0,0.0
CTRLPANEL,1023,100.0,512,50.0,100,9.8,0,0.0,0,0.0,0,0.0,0,0.0
CTRLPANEL,1023,100.0,512,50.0,900,88.0
";

// ── Throttle capture ──

#[test]
fn throttle_capture_skips_bad_lines() {
    let parsed: Vec<_> = THROTTLE_CAPTURE.lines().map(parse_throttle_line).collect();
    assert_eq!(parsed.len(), 5);
    assert!(matches!(parsed[2], Err(TelemetryError::FieldCount(1))));
    assert_eq!(parsed.iter().filter(|p| p.is_ok()).count(), 4);
}

#[test]
fn throttle_capture_calibrated_with_idle_capture() {
    let mut engine = Engine::new();
    let mut sink = LogSink::new();
    let samples: Vec<_> = THROTTLE_CAPTURE
        .lines()
        .filter_map(|line| parse_throttle_line(line).ok())
        .collect();

    // First line is the lever resting at idle
    engine.process_throttle(samples[0], &mut sink);
    execute(
        &mut engine,
        Command::CaptureIdle(quadrant_core::Control::Throttle),
        &mut sink,
    )
    .unwrap();

    let frame = engine.process_throttle(samples[1], &mut sink);
    assert_eq!(frame.values.forward, 12.5);
    assert_eq!(
        frame.batch.find(ControlLabel::Throttle),
        Some(&OutputCommand::Trigger {
            side: TriggerSide::Right,
            value: 32
        })
    );

    // Below idle is reverse thrust on the left trigger
    let frame = engine.process_throttle(samples[3], &mut sink);
    assert_eq!(frame.values.reverse, 75.0);
    let triggers: Vec<_> = frame
        .batch
        .commands()
        .filter(|c| matches!(c, OutputCommand::Trigger { .. }))
        .copied()
        .collect();
    assert_eq!(
        triggers,
        vec![
            OutputCommand::Trigger {
                side: TriggerSide::Right,
                value: 0
            },
            OutputCommand::Trigger {
                side: TriggerSide::Left,
                value: 191
            },
        ]
    );
    assert_eq!(sink.frames(), 3);
}

// ── Panel capture ──

#[test]
fn panel_capture_drives_axis_and_switch() {
    let mut engine = Engine::new();
    engine
        .panel
        .set_output_axis(0, Some(JoystickAxis::Slider0))
        .unwrap();
    engine.panel.set_kind(2, ChannelKind::Switch).unwrap();
    engine.panel.set_output_button(2, Some(9)).unwrap();
    let mut sink = LogSink::new();

    let mut gear = Vec::new();
    let mut flaps = Vec::new();
    for line in PANEL_CAPTURE.lines() {
        let Ok(raw) = parse_panel_line(line) else {
            continue;
        };
        let frame = engine.process_panel(&raw, &mut sink);
        frame.delivery.unwrap();
        if let Some(OutputCommand::Button { pressed, .. }) =
            frame.batch.find(ControlLabel::Channel(2))
        {
            gear.push(*pressed);
        }
        if let Some(OutputCommand::Axis { value, .. }) = frame.batch.find(ControlLabel::Channel(0))
        {
            flaps.push(*value);
        }
    }
    assert_eq!(gear, vec![false, true, true, false]);
    assert_eq!(flaps, vec![0, 0, 32768, 32768]);
    assert_eq!(sink.frames(), 4);
}

// ── Settings persistence ──

#[test]
fn saved_toggles_survive_restart() {
    let mut engine = Engine::new();
    engine.panel.set_kind(2, ChannelKind::Switch).unwrap();
    engine.panel.set_output_button(2, Some(9)).unwrap();
    engine.mode.set_profile(SimProfile::Dcs);
    let mut sink = LogSink::new();
    for line in PANEL_CAPTURE.lines().take(3) {
        if let Ok(raw) = parse_panel_line(line) {
            engine.process_panel(&raw, &mut sink);
        }
    }
    assert_eq!(
        execute(&mut engine, Command::Save, &mut sink).unwrap(),
        Outcome::Save
    );

    let text = config::render(&engine.to_settings(), FileFormat::Toml).unwrap();
    let restored = Engine::from_settings(&config::parse(&text, FileFormat::Toml).unwrap()).unwrap();
    assert_eq!(restored.mode.profile, SimProfile::Dcs);
    assert_eq!(
        restored.panel.export_toggles(),
        engine.panel.export_toggles()
    );
    assert!(restored.panel.export_toggles()[0].pressed);
}
