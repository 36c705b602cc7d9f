//! Replays a recorded telemetry trace through a [`DataLogger`].
//!
//! This stands in for the simulator during development: tokio tasks play the
//! host scheduler, each callback decides its own next delay, and clicks from
//! the trace toggle logging exactly as a user would.
//!
//! A trace is JSON lines, one event per line, sorted by `at` (seconds from
//! the start of the replay). Blank lines and lines starting with `#` are
//! skipped:
//!
//! ```text
//! {"event":"sample","at":0.0,"ground_speed":0.0,"latitude":46.5,"longitude":8.9,"elevation":2376.6}
//! {"event":"click","at":1.5}
//! {"event":"disable","at":30.0}
//! ```

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::{sleep, sleep_until, Instant};
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::plugin::DataLogger;
use crate::session::{NextTick, ToggleOutcome};
use crate::telemetry::{Position, SharedTelemetry};

/// Host draw rate used while replaying.
const FRAME_INTERVAL: Duration = Duration::from_millis(16);

/// One entry of a telemetry trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TraceEvent {
    /// New telemetry values.
    Sample {
        /// Seconds from the start of the replay.
        at: f64,
        /// Ground speed.
        ground_speed: f64,
        /// Latitude.
        latitude: f64,
        /// Longitude.
        longitude: f64,
        /// Elevation.
        elevation: f64,
    },
    /// The user clicked the status line.
    Click {
        /// Seconds from the start of the replay.
        at: f64,
    },
    /// The host enabled the plugin.
    Enable {
        /// Seconds from the start of the replay.
        at: f64,
    },
    /// The host disabled the plugin.
    Disable {
        /// Seconds from the start of the replay.
        at: f64,
    },
}

impl TraceEvent {
    /// Seconds from the start of the replay.
    #[must_use]
    pub fn at(&self) -> f64 {
        match self {
            Self::Sample { at, .. }
            | Self::Click { at }
            | Self::Enable { at }
            | Self::Disable { at } => *at,
        }
    }
}

/// Parse a JSON-lines trace, ordering events by time.
///
/// # Errors
///
/// Returns [`Error::TraceParse`] naming the first line that is not a valid event.
pub fn parse_trace(text: &str) -> Result<Vec<TraceEvent>> {
    let mut events = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: TraceEvent = serde_json::from_str(line).map_err(|source| Error::TraceParse {
            line: index + 1,
            source,
        })?;
        events.push(event);
    }
    events.sort_by(|a, b| a.at().total_cmp(&b.at()));
    Ok(events)
}

/// Read and parse a trace file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or a line is not a valid event.
pub fn load_trace(path: impl AsRef<Path>) -> Result<Vec<TraceEvent>> {
    let text = std::fs::read_to_string(path)?;
    parse_trace(&text)
}

/// What happened during a replay.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReplaySummary {
    /// Trace events applied.
    pub events: usize,
    /// Status ticks run.
    pub status_ticks: u64,
    /// Sample ticks run.
    pub sample_ticks: u64,
    /// Track files opened, in order.
    pub files: Vec<PathBuf>,
    /// Enable attempts that could not open a file.
    pub open_failures: u32,
    /// Distinct consecutive status lines drawn.
    pub status_lines: Vec<String>,
}

#[derive(Debug, Default)]
struct Counters {
    status_ticks: AtomicU64,
    sample_ticks: AtomicU64,
}

/// Replay `events` against `logger`, `speed` times faster than real time.
///
/// The plugin is enabled at the start and stopped after the last event. A
/// `speed` that is not a positive number replays in real time.
pub async fn replay(logger: Arc<DataLogger>, events: &[TraceEvent], speed: f64) -> ReplaySummary {
    let speed = if speed.is_finite() && speed > 0.0 {
        speed
    } else {
        1.0
    };
    let scale = move |delay: Duration| delay.div_f64(speed);
    let telemetry = Arc::new(SharedTelemetry::new());
    let counters = Arc::new(Counters::default());
    let status_lines = Arc::new(Mutex::new(Vec::<String>::new()));
    let mut summary = ReplaySummary::default();

    logger.enable();

    let status_task = {
        let logger = Arc::clone(&logger);
        let telemetry = Arc::clone(&telemetry);
        let counters = Arc::clone(&counters);
        tokio::spawn(async move {
            loop {
                let delay = logger.status_tick(telemetry.as_ref());
                counters.status_ticks.fetch_add(1, Ordering::Relaxed);
                sleep(scale(delay)).await;
            }
        })
    };

    let draw_task = {
        let logger = Arc::clone(&logger);
        let status_lines = Arc::clone(&status_lines);
        tokio::spawn(async move {
            loop {
                let line = logger.draw();
                {
                    let mut lines = status_lines.lock().unwrap_or_else(PoisonError::into_inner);
                    if lines.last() != Some(&line) {
                        debug!("Status: {line}");
                        lines.push(line);
                    }
                }
                sleep(scale(FRAME_INTERVAL)).await;
            }
        })
    };

    // Set while a sampler is registered with the "host"
    let registered = Arc::new(AtomicBool::new(false));
    let mut samplers: Vec<JoinHandle<()>> = Vec::new();
    let start = Instant::now();
    for event in events {
        sleep_until(start + scale(Duration::from_secs_f64(event.at().max(0.0)))).await;
        summary.events += 1;
        match *event {
            TraceEvent::Sample {
                ground_speed,
                latitude,
                longitude,
                elevation,
                ..
            } => {
                telemetry.update(ground_speed, Position::new(latitude, longitude, elevation));
            }
            TraceEvent::Click { .. } => match logger.click() {
                ToggleOutcome::Enabled(opened) => {
                    summary.files.push(opened.path);
                    // A sampler that is still registered picks up the new file
                    if claim(&registered) {
                        samplers.push(spawn_sampler(
                            Arc::clone(&logger),
                            Arc::clone(&telemetry),
                            Arc::clone(&counters),
                            Arc::clone(&registered),
                            scale,
                        ));
                    }
                }
                ToggleOutcome::OpenFailed => summary.open_failures += 1,
                ToggleOutcome::Disabled | ToggleOutcome::Ignored => {}
            },
            TraceEvent::Enable { .. } => logger.enable(),
            TraceEvent::Disable { .. } => logger.disable(),
        }
    }

    logger.stop();
    status_task.abort();
    // Each ends on its next tick now that logging is off
    for task in samplers {
        if let Err(e) = task.await {
            warn!("Sample task failed: {e}");
        }
    }
    draw_task.abort();
    if let Err(e) = draw_task.await {
        if !e.is_cancelled() {
            warn!("Draw task failed: {e}");
        }
    }
    // Make sure the final frame is recorded
    {
        let line = logger.draw();
        let mut lines = status_lines.lock().unwrap_or_else(PoisonError::into_inner);
        if lines.last() != Some(&line) {
            lines.push(line);
        }
        summary.status_lines = std::mem::take(&mut *lines);
    }

    summary.status_ticks = counters.status_ticks.load(Ordering::Relaxed);
    summary.sample_ticks = counters.sample_ticks.load(Ordering::Relaxed);
    info!(
        "Replayed {} events: {} status ticks, {} sample ticks, {} files",
        summary.events,
        summary.status_ticks,
        summary.sample_ticks,
        summary.files.len()
    );
    summary
}

/// Take the sampler registration if nobody holds it.
fn claim(registered: &AtomicBool) -> bool {
    registered
        .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
        .is_ok()
}

fn spawn_sampler(
    logger: Arc<DataLogger>,
    telemetry: Arc<SharedTelemetry>,
    counters: Arc<Counters>,
    registered: Arc<AtomicBool>,
    scale: impl Fn(Duration) -> Duration + Send + 'static,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let next = logger.sample_tick(telemetry.as_ref());
            counters.sample_ticks.fetch_add(1, Ordering::Relaxed);
            match next {
                NextTick::After(delay) => sleep(scale(delay)).await,
                NextTick::Stop => {
                    registered.store(false, Ordering::SeqCst);
                    // Re-enabled after our tick but before the release, when
                    // the click saw us registered and spawned nothing
                    if logger.is_logging() && claim(&registered) {
                        debug!("Sampler kept for the new file");
                        continue;
                    }
                    break;
                }
            }
        }
    })
}
