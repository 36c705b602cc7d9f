//! CLI command definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Replay command arguments.
#[derive(Debug, Args)]
pub struct ReplayCommand {
    /// JSON-lines telemetry trace to replay
    #[arg(value_name = "TRACE")]
    pub trace: PathBuf,

    /// Playback speed multiplier (2.0 replays twice as fast)
    #[arg(short, long, default_value = "1.0", value_parser = parse_speed)]
    pub speed: f64,

    /// Print the replay summary as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Resolve command arguments.
#[derive(Debug, Args)]
pub struct ResolveCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

fn parse_speed(value: &str) -> Result<f64, String> {
    let speed: f64 = value
        .parse()
        .map_err(|_| format!("`{value}` is not a number"))?;
    if speed.is_finite() && speed > 0.0 {
        Ok(speed)
    } else {
        Err("speed must be a positive number".to_string())
    }
}
