// CLI definitions using clap

use clap::{Args, Parser, Subcommand, ValueEnum};
use quadrant_core::{OutputKind, SimProfile};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quadrant-bridge")]
#[command(author, version, about = "Throttle quadrant and pot panel to virtual gamepad/joystick bridge")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Settings file path (default: ~/.config/quadrant/settings.toml)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read telemetry and drive the virtual devices
    Run(RunArgs),

    /// Show which device control each quadrant lever drives
    #[command(visible_alias = "b")]
    Bindings {
        /// Profile to show (default: from settings)
        #[arg(short, long, value_enum)]
        profile: Option<ProfileArg>,

        /// Output device to show (default: from settings)
        #[arg(short, long, value_enum)]
        output: Option<OutputArg>,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage the settings file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Args)]
pub struct RunArgs {
    /// Throttle quadrant telemetry (serial device node or capture file)
    #[arg(short, long, value_name = "PATH")]
    pub throttle: Option<PathBuf>,

    /// Pot panel telemetry (serial device node or capture file)
    #[arg(short = 'P', long, value_name = "PATH")]
    pub panel: Option<PathBuf>,

    /// Log device writes instead of creating uinput devices
    #[arg(long)]
    pub dry_run: bool,

    /// Override the simulator profile
    #[arg(short, long, value_enum)]
    pub profile: Option<ProfileArg>,

    /// Override the output device
    #[arg(short, long, value_enum)]
    pub output: Option<OutputArg>,

    /// Label the prop lever as speedbrake/spoilers
    #[arg(long)]
    pub speedbrake: bool,

    /// Read commands (next, pause, idle, ...) from stdin
    #[arg(short, long)]
    pub interactive: bool,

    /// Write calibration, toggles and mode back to the settings file on exit
    #[arg(long)]
    pub save_on_exit: bool,
}

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Write a default settings file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective settings
    Show,

    /// Print the settings file path
    Path,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ProfileArg {
    Msfs,
    Dcs,
    #[value(alias = "x-plane")]
    Xplane,
    #[value(alias = "il-2")]
    Il2,
    #[value(alias = "wt")]
    WarThunder,
}

impl From<ProfileArg> for SimProfile {
    fn from(arg: ProfileArg) -> Self {
        match arg {
            ProfileArg::Msfs => SimProfile::Msfs,
            ProfileArg::Dcs => SimProfile::Dcs,
            ProfileArg::Xplane => SimProfile::XPlane,
            ProfileArg::Il2 => SimProfile::Il2,
            ProfileArg::WarThunder => SimProfile::WarThunder,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputArg {
    #[value(alias = "xbox")]
    Gamepad,
    #[value(alias = "vjoy")]
    Joystick,
}

impl From<OutputArg> for OutputKind {
    fn from(arg: OutputArg) -> Self {
        match arg {
            OutputArg::Gamepad => OutputKind::Gamepad,
            OutputArg::Joystick => OutputKind::ExtendedJoystick,
        }
    }
}
