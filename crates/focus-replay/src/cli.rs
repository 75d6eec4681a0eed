//! Command-line interface definitions for focus-replay.

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use logging::LogArgs;

/// Command-line interface for the `focus-replay` binary.
#[derive(Parser, Debug)]
#[command(
    name = "focus-replay",
    about = "Replay scripted focus interactions and print how each focus was classified",
    version
)]
pub struct Cli {
    /// Logging controls shared across workspace binaries.
    #[command(flatten)]
    pub log: LogArgs,

    /// What to do.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scenario file and print the focus transcript.
    Run(RunArgs),
}

/// Arguments for the `run` subcommand.
#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    /// Scenario file in RON syntax.
    #[arg(value_name = "SCENARIO")]
    pub scenario: PathBuf,

    /// Optional monitor configuration file (RON).
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override how long a touch keeps classifying focus as touch.
    #[arg(long, value_parser = humantime::parse_duration, value_name = "DURATION")]
    pub touch_buffer: Option<Duration>,

    /// Simulate a host without interactive capabilities.
    #[arg(long)]
    pub headless: bool,
}
