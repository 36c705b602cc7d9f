//! `datalogger` - A flight simulator plugin that records the aircraft's track
//!
//! This library watches ground speed and position, prompts the user to start
//! logging once the aircraft moves, and writes each logging session to a GPX
//! track file in a configurable directory.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod error;
pub mod indicator;
pub mod logging;
pub mod motion;
pub mod path;
pub mod plugin;
pub mod prompt;
pub mod replay;
pub mod session;
pub mod telemetry;
pub mod track;

#[cfg(test)]
mod test_support;

pub use config::Config;
pub use error::{Error, Result};
pub use indicator::StatusView;
pub use logging::init_logging;
pub use path::{LogDirectory, PathResolver};
pub use plugin::{DataLogger, HostMessage};
pub use session::{LoggingSession, NextTick, SessionState, ToggleOutcome};
pub use telemetry::{Channel, Position, SharedTelemetry, TelemetrySource};
pub use track::TrackWriter;
