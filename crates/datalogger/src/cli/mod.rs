//! Command-line interface for the `datalog` development host.
//!
//! The plugin has no command line of its own. `datalog` loads the same
//! configuration, resolves the same log directory and replays recorded
//! telemetry through the plugin callbacks.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{ConfigCommand, ReplayCommand, ResolveCommand};

/// datalog - Drive the data logger plugin outside the simulator
///
/// Replays telemetry traces through the plugin callbacks and writes the same
/// GPX tracks the plugin writes in flight.
#[derive(Debug, Parser)]
#[command(name = "datalog")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Replay a telemetry trace through the plugin
    Replay(ReplayCommand),

    /// Show the log directory the plugin would use
    Resolve(ResolveCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
            }
        }
    }
}
