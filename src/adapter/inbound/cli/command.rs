//! Command-line interface definitions.
//!
//! Defines the CLI structure for perpwatch using `clap`: running the relay,
//! validating configuration and inspecting the stored cursor.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use super::paths;

/// Relay perpetuals position and liquidation events to Telegram
#[derive(Parser, Debug)]
#[command(name = "perpwatch")]
#[command(version)]
pub struct Cli {
    /// JSON output for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Decrease output verbosity
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the relay in the foreground
    Run(RunArgs),

    /// Run diagnostic checks
    #[command(subcommand)]
    Check(CheckCommand),

    /// Inspect the stored watermark
    #[command(subcommand)]
    Cursor(CursorCommand),
}

/// Subcommands for `perpwatch check`.
#[derive(Subcommand, Debug)]
pub enum CheckCommand {
    /// Validate the configuration file syntax and semantics.
    Config(ConfigPathArg),
}

/// Subcommands for `perpwatch cursor`.
#[derive(Subcommand, Debug)]
pub enum CursorCommand {
    /// Show the watermark of the configured source and store.
    Show(ConfigPathArg),
}

/// Shared argument for commands that only need a configuration path.
#[derive(Parser, Debug)]
pub struct ConfigPathArg {
    /// Path to the configuration file.
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,
}

/// Arguments for the `run` subcommand.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the configuration file.
    #[arg(short, long, default_value_os_t = paths::default_config())]
    pub config: PathBuf,

    /// Log messages instead of sending them to Telegram.
    #[arg(long)]
    pub dry_run: bool,

    /// Log level or filter directive, e.g. `debug` or `perpwatch=trace`.
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit logs as JSON lines.
    #[arg(long)]
    pub json_logs: bool,
}
