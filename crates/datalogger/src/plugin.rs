//! Host-facing surface.
//!
//! [`DataLogger`] is the single object a host adapter owns. It maps the
//! host's lifecycle hooks, pointer clicks, draw frames and scheduled
//! callbacks onto the [`LoggingSession`]. Nothing here panics or returns an
//! error to the host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info};

use crate::config::Config;
use crate::path::{LogDirectory, PathResolver};
use crate::session::{LoggingSession, NextTick, ToggleOutcome};
use crate::telemetry::TelemetrySource;

/// Name the plugin registers under.
pub const PLUGIN_NAME: &str = "DataLogger";

/// Unique plugin signature.
pub const PLUGIN_SIGNATURE: &str = "datalogger.gpx.track";

/// Plugin description shown by the host.
#[must_use]
pub fn plugin_description() -> String {
    format!("{PLUGIN_NAME} v{}", env!("CARGO_PKG_VERSION"))
}

/// Messages the simulator broadcasts to plugins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMessage {
    /// A plane model was loaded.
    PlaneLoaded,
    /// The user's plane was positioned at an airport.
    AirportLoaded,
    /// New scenery was loaded.
    SceneryLoaded,
    /// The number of planes changed.
    AirplaneCountChanged,
    /// The user's plane crashed.
    PlaneCrashed,
    /// A plane model was unloaded.
    PlaneUnloaded,
    /// Any other message id.
    Other(i64),
}

/// The plugin instance.
#[derive(Debug)]
pub struct DataLogger {
    config: Config,
    host_enabled: AtomicBool,
    session: LoggingSession,
}

impl DataLogger {
    /// Plugin start: resolve the log directory and build a disabled session.
    ///
    /// The host must still call [`DataLogger::enable`] before anything runs.
    #[must_use]
    pub fn start(config: Config) -> Self {
        let directory = PathResolver::new(&config.paths.path_file).resolve();
        Self::with_directory(config, directory)
    }

    /// Plugin start with an already resolved directory.
    #[must_use]
    pub fn with_directory(config: Config, directory: LogDirectory) -> Self {
        info!(
            "{} ({PLUGIN_SIGNATURE}) started, log directory {directory}",
            plugin_description()
        );
        let session = LoggingSession::new(&config, directory);
        Self {
            config,
            host_enabled: AtomicBool::new(false),
            session,
        }
    }

    /// The host enabled the plugin.
    pub fn enable(&self) {
        self.host_enabled.store(true, Ordering::SeqCst);
        info!("{PLUGIN_NAME} enabled");
    }

    /// The host disabled the plugin; logging stops.
    pub fn disable(&self) {
        self.host_enabled.store(false, Ordering::SeqCst);
        self.session.shutdown();
        info!("{PLUGIN_NAME} disabled");
    }

    /// The host is unloading the plugin.
    pub fn stop(&self) {
        self.host_enabled.store(false, Ordering::SeqCst);
        self.session.shutdown();
        info!("{PLUGIN_NAME} stopped");
    }

    /// Whether the host currently has the plugin enabled.
    #[must_use]
    pub fn is_host_enabled(&self) -> bool {
        self.host_enabled.load(Ordering::SeqCst)
    }

    /// Whether a sample callback should currently be registered.
    #[must_use]
    pub fn is_logging(&self) -> bool {
        self.is_host_enabled() && self.session.is_enabled()
    }

    /// A broadcast message from the simulator. Only logged.
    pub fn receive_message(&self, message: HostMessage) {
        debug!("Host message {message:?}");
    }

    /// Pointer released over the status line.
    pub fn click(&self) -> ToggleOutcome {
        if !self.is_host_enabled() {
            return ToggleOutcome::Ignored;
        }
        self.session.toggle(Utc::now())
    }

    /// Text for this draw frame.
    pub fn draw(&self) -> String {
        self.session.display_frame().text()
    }

    /// Status tick callback; returns the delay until the next call.
    pub fn status_tick(&self, telemetry: &dyn TelemetrySource) -> Duration {
        if !self.is_host_enabled() {
            return self.config.host_disabled_interval();
        }
        self.session.status_tick(telemetry.ground_speed())
    }

    /// Sample tick callback; [`NextTick::Stop`] unregisters it.
    pub fn sample_tick(&self, telemetry: &dyn TelemetrySource) -> NextTick {
        if !self.is_host_enabled() {
            return NextTick::Stop;
        }
        self.session.sample_tick(telemetry.position(), Utc::now())
    }

    /// The underlying session.
    #[must_use]
    pub fn session(&self) -> &LoggingSession {
        &self.session
    }

    /// Configuration in use.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for DataLogger {
    fn drop(&mut self) {
        self.session.shutdown();
    }
}
