//! `datalog` - Development host for the datalogger plugin
//!
//! This binary stands in for the simulator: it loads the plugin
//! configuration, resolves the log directory and replays telemetry traces
//! through the plugin callbacks.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;

use datalogger::cli::{Cli, Command, ConfigCommand, ReplayCommand, ResolveCommand};
use datalogger::{init_logging, replay, Config, DataLogger, PathResolver};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Execute the command
    match cli.command {
        Command::Replay(replay_cmd) => handle_replay(load_config(cli.config)?, &replay_cmd),
        Command::Resolve(resolve_cmd) => handle_resolve(&load_config(cli.config)?, &resolve_cmd),
        Command::Config(config_cmd) => handle_config(cli.config, config_cmd),
    }
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<Config> {
    Config::load_from(path).context("failed to load configuration")
}

fn handle_replay(config: Config, cmd: &ReplayCommand) -> anyhow::Result<()> {
    let events = replay::load_trace(&cmd.trace)
        .with_context(|| format!("failed to read trace {}", cmd.trace.display()))?;

    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    let logger = Arc::new(DataLogger::start(config));
    let summary = runtime.block_on(replay::replay(logger, &events, cmd.speed));

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("Replay summary");
        println!("--------------");
        println!("Events:        {}", summary.events);
        println!("Status ticks:  {}", summary.status_ticks);
        println!("Sample ticks:  {}", summary.sample_ticks);
        println!("Open failures: {}", summary.open_failures);
        println!("Track files:   {}", summary.files.len());
        for file in &summary.files {
            println!("  {}", file.display());
        }
    }
    Ok(())
}

fn handle_resolve(config: &Config, cmd: &ResolveCommand) -> anyhow::Result<()> {
    let resolver = PathResolver::new(&config.paths.path_file);
    let directory = resolver.resolve();

    if cmd.json {
        let status = serde_json::json!({
            "path_file": resolver.path_file(),
            "directory": directory.to_string(),
            "working_dir": directory.is_working_dir(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("Path file:     {}", resolver.path_file().display());
        println!("Log directory: {directory}");
    }
    Ok(())
}

fn handle_config(config_path: Option<PathBuf>, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            let config = load_config(config_path)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&config)?);
            } else {
                print_config(&config);
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file
                .or(config_path)
                .unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}

fn print_config(config: &Config) {
    println!("Current Configuration");
    println!("=====================");
    println!();
    println!("[Paths]");
    println!("  Path file:          {}", config.paths.path_file.display());
    println!("  Track name:         {}", config.paths.track_name);
    println!();
    println!("[Motion]");
    println!(
        "  Speed threshold:    {}",
        config.motion.ground_speed_threshold
    );
    println!("  Moving ticks:       {}", config.motion.moving_ticks);
    println!();
    println!("[Prompt]");
    println!("  Flash ticks:        {}", config.prompt.flash_ticks);
    println!("  Flash interval:     {:?}", config.flash_interval());
    println!();
    println!("[Session]");
    println!("  Sample interval:    {:?}", config.sample_interval());
    println!("  Idle interval:      {:?}", config.idle_interval());
    println!("  Moving interval:    {:?}", config.moving_interval());
    println!("  Enabled interval:   {:?}", config.enabled_interval());
    println!("  Error frames:       {}", config.session.file_error_frames);
    println!("  Indicator max:      {}", config.session.indicator_max);
}
