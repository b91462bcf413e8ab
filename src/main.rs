//! Throttle quadrant bridge
//!
//! Main entry point and run loop.

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use quadrant_bridge::cli::{Cli, Commands, ConfigAction, OutputArg, ProfileArg, RunArgs};
use quadrant_bridge::commands::{self, Command, Outcome};
use quadrant_bridge::config::{self, FileFormat};
use quadrant_bridge::telemetry::{line_stream, parse_panel_line, parse_throttle_line};
use quadrant_bridge::{LogSink, UinputSink};
use quadrant_core::{
    ChannelConfig, ChannelKind, Engine, OutputError, OutputKind, OutputSink, ProfileMapper,
    Settings, SimProfile, ThrottleSample, CHANNEL_COUNT,
};

/// Telemetry streams read by background tasks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Source {
    Throttle,
    Panel,
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Throttle => f.write_str("Throttle quadrant"),
            Source::Panel => f.write_str("Control panel"),
        }
    }
}

/// Messages from the reader tasks
enum InputMessage {
    Throttle(ThrottleSample),
    Panel([f64; CHANNEL_COUNT]),
    Command(Command),
    Closed(Source),
    Interrupted,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let config_path = cli.config.unwrap_or_else(config::default_path);

    match cli.command {
        Commands::Run(args) => run(args, config_path).await,
        Commands::Bindings {
            profile,
            output,
            json,
        } => show_bindings(&config_path, profile, output, json),
        Commands::Config { action } => manage_config(action, &config_path),
    }
}

/// Read telemetry until every stream ends or Ctrl+C
async fn run(args: RunArgs, config_path: PathBuf) -> Result<()> {
    if args.throttle.is_none() && args.panel.is_none() {
        anyhow::bail!("Nothing to read: pass --throttle and/or --panel");
    }

    info!("Loading settings from {:?}", config_path);
    let settings = config::load(&config_path)?;
    let mut engine = Engine::from_settings(&settings)?;
    if let Some(profile) = args.profile {
        engine.mode.set_profile(profile.into());
    }
    if let Some(output) = args.output {
        engine.set_output_kind(output.into());
    }
    if args.speedbrake {
        engine.set_speedbrake(true);
    }

    let mut sink: Box<dyn OutputSink> = if args.dry_run {
        info!("Dry run: device writes are logged, not performed");
        Box::new(LogSink::new())
    } else {
        Box::new(UinputSink::open())
    };

    let (tx, mut rx) = mpsc::unbounded_channel::<InputMessage>();
    let mut open_streams = 0usize;
    for (source, path) in [
        (Source::Throttle, args.throttle),
        (Source::Panel, args.panel),
    ] {
        if let Some(path) = path {
            spawn_reader(source, path, tx.clone());
            open_streams += 1;
        }
    }
    if args.interactive {
        spawn_console(tx.clone());
        info!("Type \"help\" for commands");
    }
    let interrupt_tx = tx.clone();
    ctrlc::set_handler(move || {
        let _ = interrupt_tx.send(InputMessage::Interrupted);
    })
    .context("Failed to install Ctrl+C handler")?;
    drop(tx);

    info!(
        "{} via {}",
        engine.mode.profile,
        engine.mode.effective_output()
    );
    for binding in engine.bindings() {
        info!("  {}", binding);
    }

    let mut reporter = DeliveryReporter::default();

    info!("Entering main loop. Press Ctrl+C to exit.");

    while let Some(msg) = rx.recv().await {
        match msg {
            InputMessage::Throttle(sample) => {
                let frame = engine.process_throttle(sample, sink.as_mut());
                debug!(
                    "Forward {:.1} Reverse {:.1} Prop {:.1} Mixture {:.1}",
                    frame.values.forward,
                    frame.values.reverse,
                    frame.values.prop,
                    frame.values.mixture
                );
                reporter.report(frame.delivery);
            }
            InputMessage::Panel(raw) => {
                let frame = engine.process_panel(&raw, sink.as_mut());
                debug!("Panel {:?}", frame.values);
                reporter.report(frame.delivery);
            }
            InputMessage::Command(cmd) => {
                match commands::execute(&mut engine, cmd, sink.as_mut()) {
                    Ok(Outcome::Continue) => {}
                    Ok(Outcome::Save) => save_settings(&engine, &config_path),
                    Ok(Outcome::Quit) => break,
                    Err(e) => warn!("{}", e),
                }
            }
            InputMessage::Closed(source) => {
                info!("{} stream ended", source);
                open_streams = open_streams.saturating_sub(1);
                if open_streams == 0 {
                    break;
                }
            }
            InputMessage::Interrupted => {
                info!("Interrupted, shutting down");
                break;
            }
        }
    }

    // Leave the devices at rest
    if let Err(e) = engine.neutral().deliver(sink.as_mut()) {
        debug!("Could not reset devices: {}", e);
    }

    if args.save_on_exit {
        save_settings(&engine, &config_path);
    }

    Ok(())
}

/// Spawn a task reading one telemetry stream
fn spawn_reader(source: Source, path: PathBuf, tx: mpsc::UnboundedSender<InputMessage>) {
    tokio::spawn(async move {
        if let Err(e) = read_telemetry(source, &path, &tx).await {
            error!("{} ({}): {:#}", source, path.display(), e);
        }
        let _ = tx.send(InputMessage::Closed(source));
    });
}

async fn read_telemetry(
    source: Source,
    path: &Path,
    tx: &mpsc::UnboundedSender<InputMessage>,
) -> Result<()> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open {}", path.display()))?;
    info!("Reading {} telemetry from {}", source, path.display());

    let lines = line_stream(BufReader::new(file));
    futures::pin_mut!(lines);

    while let Some(line) = lines.next().await {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let msg = match source {
            Source::Throttle => match parse_throttle_line(&line) {
                Ok(sample) => InputMessage::Throttle(sample),
                Err(e) => {
                    warn!("Skipping throttle line {:?}: {}", line, e);
                    continue;
                }
            },
            // The panel shares its port with debug chatter
            Source::Panel => match parse_panel_line(&line) {
                Ok(raw) => InputMessage::Panel(raw),
                Err(_) => continue,
            },
        };
        if tx.send(msg).is_err() {
            break;
        }
    }
    Ok(())
}

/// Read console commands from stdin on a dedicated thread
///
/// The thread is detached; returning from `main` ends the process even
/// while it is blocked on a read.
fn spawn_console(tx: mpsc::UnboundedSender<InputMessage>) {
    let spawned = std::thread::Builder::new()
        .name("console".into())
        .spawn(move || {
            commands::read_console(std::io::stdin().lock(), |cmd| {
                tx.send(InputMessage::Command(cmd)).is_ok()
            });
        });
    if let Err(e) = spawned {
        warn!("Console input unavailable: {}", e);
    }
}

/// Logs delivery failures without flooding on every sample
#[derive(Default)]
struct DeliveryReporter {
    unavailable_warned: bool,
}

impl DeliveryReporter {
    fn report(&mut self, result: Result<(), OutputError>) {
        match result {
            Ok(()) | Err(OutputError::Paused) => {}
            Err(e @ OutputError::SinkUnavailable(_)) => {
                if self.unavailable_warned {
                    debug!("{}", e);
                } else {
                    warn!("{}; values are computed but not delivered", e);
                    self.unavailable_warned = true;
                }
            }
            Err(e) => warn!("Failed to update device: {}", e),
        }
    }
}

fn save_settings(engine: &Engine, path: &Path) {
    match config::save(&engine.to_settings(), path) {
        Ok(()) => info!("Saved settings to {}", path.display()),
        Err(e) => error!("Failed to save settings: {:#}", e),
    }
}

#[derive(Serialize)]
struct BindingSummary {
    profile: SimProfile,
    output: OutputKind,
    quadrant: Vec<BindingRow>,
    panel: Vec<BindingRow>,
}

#[derive(Serialize)]
struct BindingRow {
    control: String,
    target: String,
}

/// Bindings of panel channels that write to the joystick
fn panel_bindings(channels: &[ChannelConfig]) -> Vec<BindingRow> {
    channels
        .iter()
        .filter_map(|channel| {
            let target = match (channel.kind, channel.output_axis, channel.output_button_id) {
                (ChannelKind::Axis, Some(axis), _) => {
                    format!("Joystick {}-Axis", axis.display_name())
                }
                (ChannelKind::Switch | ChannelKind::Button, _, Some(id)) => {
                    format!("Joystick Button {} ({})", id, channel.kind.display_name())
                }
                _ => return None,
            };
            Some(BindingRow {
                control: channel.name.clone(),
                target,
            })
        })
        .collect()
}

fn show_bindings(
    config_path: &Path,
    profile: Option<ProfileArg>,
    output: Option<OutputArg>,
    json: bool,
) -> Result<()> {
    let settings = config::load(config_path)?;
    let profile = profile.map(SimProfile::from).unwrap_or(settings.profile);
    let kind = output.map(OutputKind::from).unwrap_or(settings.output_kind);
    let bindings = ProfileMapper::new(settings.prop_as_speedbrake).bindings(profile, kind);

    let summary = BindingSummary {
        profile,
        output: profile.effective_output(kind),
        quadrant: bindings
            .iter()
            .map(|b| BindingRow {
                control: b.label.to_string(),
                target: b.target.to_string(),
            })
            .collect(),
        panel: panel_bindings(&settings.channels),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("{} via {}", summary.profile, summary.output);
    for row in &summary.quadrant {
        println!("  {}: {}", row.control, row.target);
    }
    if !summary.panel.is_empty() {
        println!("Panel:");
        for row in &summary.panel {
            println!("  {}: {}", row.control, row.target);
        }
    }
    Ok(())
}

fn manage_config(action: ConfigAction, path: &Path) -> Result<()> {
    match action {
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                anyhow::bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }
            config::save(&Settings::default(), path)?;
            println!("Wrote {}", path.display());
        }
        ConfigAction::Show => {
            let settings = config::load(path)?;
            print!("{}", config::render(&settings, FileFormat::for_path(path))?);
        }
        ConfigAction::Path => println!("{}", path.display()),
    }
    Ok(())
}
