//! The logging session: enable/disable, motion prompting and sampling.
//!
//! A [`LoggingSession`] is shared by reference with every host callback. Flags
//! and counters are independent atomics; the track writer and its directory
//! sit behind one mutex, held only while a file is opened, written or closed.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, trace, warn};

use crate::config::Config;
use crate::indicator::StatusView;
use crate::motion::{MotionDetector, MotionEvent, MotionState};
use crate::path::LogDirectory;
use crate::prompt::{PromptFlasher, PromptState};
use crate::telemetry::Position;
use crate::track::{Opened, TrackWriter};

/// Whether positions are being logged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// Not logging.
    #[default]
    Disabled,
    /// Logging to an open track file.
    Enabled,
}

/// Result of a user toggle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// Logging started; the host should begin sample ticks.
    Enabled(Opened),
    /// Logging stopped.
    Disabled,
    /// No log file could be opened; the session stays disabled.
    OpenFailed,
    /// A recent open failure is still cooling down; nothing happened.
    Ignored,
}

/// When a periodic callback wants to run next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextTick {
    /// Call again after this delay.
    After(Duration),
    /// Unregister until logging is enabled again.
    Stop,
}

/// Read-only view of every session cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Logging state.
    pub state: SessionState,
    /// Motion detector state.
    pub motion: MotionState,
    /// Prompt flasher state.
    pub prompt: PromptState,
    /// Dot count of the enabled indicator.
    pub indicator: u32,
    /// Draw frames left on the file-open error.
    pub file_error_frames: u32,
    /// Track file being written, if any.
    pub log_file: Option<PathBuf>,
    /// Directory the next track file will be created in.
    pub directory: LogDirectory,
}

/// Countdown that keeps the file-open error on screen and blocks toggles.
#[derive(Debug, Default)]
struct ErrorLatch {
    remaining: AtomicU32,
}

impl ErrorLatch {
    fn raise(&self, frames: u32) {
        self.remaining.store(frames, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.remaining.load(Ordering::SeqCst) > 0
    }

    /// Spend one frame; true if the latch was still active.
    fn consume_frame(&self) -> bool {
        self.remaining
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }

    fn remaining(&self) -> u32 {
        self.remaining.load(Ordering::SeqCst)
    }
}

#[derive(Debug)]
struct Output {
    writer: TrackWriter,
    directory: LogDirectory,
}

/// Logging session shared by the host callbacks.
#[derive(Debug)]
pub struct LoggingSession {
    config: Config,
    enabled: AtomicBool,
    motion: MotionDetector,
    prompt: PromptFlasher,
    indicator: AtomicU32,
    file_error: ErrorLatch,
    output: Mutex<Output>,
}

impl LoggingSession {
    /// Create a disabled session logging into `directory`.
    #[must_use]
    pub fn new(config: &Config, directory: LogDirectory) -> Self {
        Self {
            config: config.clone(),
            enabled: AtomicBool::new(false),
            motion: MotionDetector::new(config.motion.clone()),
            prompt: PromptFlasher::new(config.prompt.flash_ticks),
            indicator: AtomicU32::new(1),
            file_error: ErrorLatch::default(),
            output: Mutex::new(Output {
                writer: TrackWriter::new(config.paths.track_name.clone()),
                directory,
            }),
        }
    }

    /// Current logging state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        if self.enabled.load(Ordering::SeqCst) {
            SessionState::Enabled
        } else {
            SessionState::Disabled
        }
    }

    /// Whether logging is enabled.
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.state() == SessionState::Enabled
    }

    /// The user clicked the status line.
    pub fn toggle(&self, now: DateTime<Utc>) -> ToggleOutcome {
        let mut output = self.lock_output();

        if self.is_enabled() {
            self.disable_locked(&mut output);
            return ToggleOutcome::Disabled;
        }

        if self.file_error.is_active() {
            debug!("Ignoring toggle while the open error is displayed");
            return ToggleOutcome::Ignored;
        }

        let output = &mut *output;
        match output.writer.open(&output.directory, now) {
            Ok(opened) => {
                if opened.used_fallback {
                    warn!(
                        "Log directory {} unusable, using the working directory from now on",
                        output.directory
                    );
                    output.directory = LogDirectory::working_dir();
                }
                // Publish Enabled before cancelling so a status tick that
                // activates the prompt concurrently sees it and cancels too
                self.enabled.store(true, Ordering::SeqCst);
                self.prompt.cancel();
                self.motion.reset();
                self.indicator.store(1, Ordering::SeqCst);
                info!("Logging enabled");
                ToggleOutcome::Enabled(opened)
            }
            Err(e) => {
                warn!("Logging not enabled: {e}");
                self.file_error.raise(self.config.session.file_error_frames);
                ToggleOutcome::OpenFailed
            }
        }
    }

    /// Force the session to disabled, closing any open track file.
    pub fn shutdown(&self) {
        let mut output = self.lock_output();
        if self.is_enabled() || output.writer.is_open() {
            self.disable_locked(&mut output);
        }
    }

    /// Periodic status check; returns the delay until the next one.
    pub fn status_tick(&self, ground_speed: f64) -> Duration {
        if self.is_enabled() {
            let dots = self.advance_indicator();
            self.motion.reset();
            self.prompt.cancel();
            if !self.is_enabled() {
                // Disabled mid-tick
                self.indicator.store(1, Ordering::SeqCst);
            }
            trace!("Indicator at {dots}");
            return self.config.enabled_interval();
        }

        self.indicator.store(1, Ordering::SeqCst);

        if self.prompt.is_active() {
            if self.motion.tick(ground_speed) == MotionEvent::BecameStationary {
                self.prompt.cancel();
                return self.config.idle_interval();
            }
            self.prompt.tick();
            return self.config.flash_interval();
        }

        if self.motion.tick(ground_speed) == MotionEvent::BecameMoving {
            self.prompt.activate();
            if self.is_enabled() {
                // Logging started after the check above
                self.prompt.cancel();
            }
        }
        if self.motion.is_moving() {
            self.config.moving_interval()
        } else {
            self.config.idle_interval()
        }
    }

    /// Periodic position sample while logging.
    pub fn sample_tick(&self, position: Position, now: DateTime<Utc>) -> NextTick {
        if !self.is_enabled() {
            return NextTick::Stop;
        }

        let mut output = self.lock_output();
        if !output.writer.is_open() {
            return NextTick::Stop;
        }
        if let Err(e) = output.writer.record(position, now) {
            warn!("Failed to write track point: {e}");
        }
        NextTick::After(self.config.sample_interval())
    }

    /// Status line for one draw frame. Counts down the file-open error.
    pub fn display_frame(&self) -> StatusView {
        if self.is_enabled() {
            return StatusView::Enabled {
                dots: self.indicator.load(Ordering::SeqCst),
            };
        }
        if self.file_error.consume_frame() {
            return StatusView::FileError;
        }
        if self.prompt.is_active() {
            return StatusView::Flashing {
                visible: self.prompt.is_visible(),
            };
        }
        StatusView::Idle
    }

    /// Read every cell.
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let output = self.lock_output();
        SessionSnapshot {
            state: self.state(),
            motion: self.motion.state(),
            prompt: self.prompt.state(),
            indicator: self.indicator.load(Ordering::SeqCst),
            file_error_frames: self.file_error.remaining(),
            log_file: output.writer.path().map(PathBuf::from),
            directory: output.directory.clone(),
        }
    }

    fn disable_locked(&self, output: &mut Output) {
        self.enabled.store(false, Ordering::SeqCst);
        self.indicator.store(1, Ordering::SeqCst);
        self.prompt.cancel();
        self.motion.reset();
        if let Err(e) = output.writer.close() {
            warn!("Failed to finalize track file: {e}");
        }
        info!("Logging disabled");
    }

    /// Step the dot count within `1..=indicator_max`, returning the new value.
    fn advance_indicator(&self) -> u32 {
        let max = self.config.session.indicator_max;
        let step = |n: u32| if n >= max { 1 } else { n + 1 };
        // The closure never declines, so both arms hold the previous value
        let previous = match self
            .indicator
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| Some(step(n)))
        {
            Ok(n) | Err(n) => n,
        };
        step(previous)
    }

    fn lock_output(&self) -> MutexGuard<'_, Output> {
        self.output.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::test_support::{log_directory, WorkingDirEntry};
    use chrono::TimeZone;
    use std::fs;
    use std::path::Path;
    use std::sync::Barrier;
    use std::thread;

    fn at(second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 8, 0, second).unwrap()
    }

    fn session_in(path: &Path) -> LoggingSession {
        init_test_logging();
        LoggingSession::new(&Config::default(), log_directory(path))
    }

    fn confirm_motion(session: &LoggingSession) {
        for _ in 0..5 {
            session.status_tick(30.0);
        }
    }

    #[test]
    fn test_initial_state() {
        let tmp = tempfile::tempdir().unwrap();
        let snapshot = session_in(tmp.path()).snapshot();

        assert_eq!(snapshot.state, SessionState::Disabled);
        assert_eq!(snapshot.motion, MotionState::Stationary(0));
        assert_eq!(snapshot.prompt, PromptState::Hidden);
        assert_eq!(snapshot.indicator, 1);
        assert_eq!(snapshot.file_error_frames, 0);
        assert!(snapshot.log_file.is_none());
    }

    #[test]
    fn test_toggle_enables_and_disables() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());

        let ToggleOutcome::Enabled(opened) = session.toggle(at(0)) else {
            panic!("expected logging to start");
        };
        assert!(session.is_enabled());
        assert_eq!(session.snapshot().log_file, Some(opened.path.clone()));

        assert_eq!(session.toggle(at(1)), ToggleOutcome::Disabled);
        assert!(!session.is_enabled());
        assert!(fs::read_to_string(&opened.path)
            .unwrap()
            .ends_with("</trkseg></trk>\n</gpx>\n"));
    }

    #[test]
    fn test_enable_disable_cycle_restores_initial_state() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        let initial = session.snapshot();

        session.toggle(at(0));
        for _ in 0..4 {
            session.status_tick(30.0);
        }
        session.sample_tick(Position::new(1.0, 2.0, 3.0), at(1));
        assert_ne!(session.snapshot().indicator, 1);

        session.toggle(at(2));
        assert_eq!(session.snapshot(), initial);
    }

    #[test]
    fn test_enabling_cancels_flashing_prompt() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        confirm_motion(&session);
        session.status_tick(30.0);
        assert!(session.snapshot().prompt != PromptState::Hidden);

        assert!(matches!(session.toggle(at(0)), ToggleOutcome::Enabled(_)));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.prompt, PromptState::Hidden);
        assert_eq!(snapshot.motion, MotionState::Stationary(0));
        assert_eq!(session.display_frame(), StatusView::Enabled { dots: 1 });
    }

    #[test]
    fn test_enabled_status_tick_cancels_stale_prompt() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        let initial = session.snapshot();
        assert!(matches!(session.toggle(at(0)), ToggleOutcome::Enabled(_)));

        // A status tick that read Disabled just before the toggle
        session.prompt.activate();
        session.motion.tick(30.0);
        assert_eq!(session.snapshot().prompt, PromptState::ACTIVATED);

        assert_eq!(session.status_tick(30.0), Duration::from_secs(1));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.prompt, PromptState::Hidden);
        assert_eq!(snapshot.motion, MotionState::Stationary(0));
        assert_eq!(session.display_frame(), StatusView::Enabled { dots: 2 });

        session.toggle(at(1));
        assert_eq!(session.snapshot(), initial);
    }

    #[test]
    fn test_toggle_racing_status_tick_never_leaves_prompt_enabled() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        let barrier = Barrier::new(2);

        for round in 0..200 {
            // One more moving tick confirms motion and activates the prompt
            for _ in 0..4 {
                session.status_tick(30.0);
            }
            let now = at(0) + chrono::Duration::seconds(round);
            thread::scope(|scope| {
                scope.spawn(|| {
                    barrier.wait();
                    session.status_tick(30.0);
                });
                barrier.wait();
                assert!(matches!(session.toggle(now), ToggleOutcome::Enabled(_)));
            });

            assert!(session.is_enabled());
            assert_eq!(session.snapshot().prompt, PromptState::Hidden, "round {round}");
            session.status_tick(30.0);
            assert_eq!(session.snapshot().prompt, PromptState::Hidden, "round {round}");

            assert_eq!(session.toggle(now), ToggleOutcome::Disabled);
            let snapshot = session.snapshot();
            assert_eq!(snapshot.prompt, PromptState::Hidden);
            assert_eq!(snapshot.motion, MotionState::Stationary(0));
            assert_eq!(snapshot.indicator, 1);
        }
    }

    #[test]
    fn test_flasher_settles_after_twenty_ticks_with_continued_motion() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        confirm_motion(&session);
        assert_eq!(session.snapshot().prompt, PromptState::ACTIVATED);

        for _ in 0..19 {
            assert_eq!(session.status_tick(30.0), Duration::from_millis(500));
            assert_ne!(session.snapshot().prompt, PromptState::Hidden);
        }
        session.status_tick(30.0);
        assert_eq!(session.snapshot().prompt, PromptState::Hidden);

        // Still moving: no new prompt, relaxed cadence
        assert_eq!(session.status_tick(30.0), Duration::from_secs(2));
        assert_eq!(session.snapshot().prompt, PromptState::Hidden);
    }

    #[test]
    fn test_stopping_cancels_prompt_and_rearms() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        confirm_motion(&session);
        session.status_tick(30.0);

        assert_eq!(session.status_tick(0.0), Duration::from_secs(1));
        let snapshot = session.snapshot();
        assert_eq!(snapshot.prompt, PromptState::Hidden);
        assert_eq!(snapshot.motion, MotionState::Stationary(0));

        confirm_motion(&session);
        assert_eq!(session.snapshot().prompt, PromptState::ACTIVATED);
    }

    #[test]
    fn test_status_tick_while_enabled_cycles_indicator() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        session.toggle(at(0));

        let mut seen = Vec::new();
        for _ in 0..11 {
            assert_eq!(session.status_tick(30.0), Duration::from_secs(1));
            seen.push(session.snapshot().indicator);
        }
        assert_eq!(seen, vec![2, 3, 4, 5, 6, 7, 8, 9, 10, 1, 2]);
        assert_eq!(session.snapshot().motion, MotionState::Stationary(0));
        session.shutdown();
    }

    #[test]
    fn test_sample_tick_records_deduplicated_points() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        let ToggleOutcome::Enabled(opened) = session.toggle(at(0)) else {
            panic!("expected logging to start");
        };

        for (second, lat) in [(1, 1.0), (2, 1.0), (3, 2.0)] {
            assert_eq!(
                session.sample_tick(Position::new(lat, 1.0, 1.0), at(second)),
                NextTick::After(Duration::from_millis(100))
            );
        }
        session.toggle(at(4));

        let contents = fs::read_to_string(&opened.path).unwrap();
        assert_eq!(contents.matches("<trkpt ").count(), 2);
    }

    #[test]
    fn test_sample_tick_stops_when_disabled() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        assert_eq!(
            session.sample_tick(Position::default(), at(0)),
            NextTick::Stop
        );
    }

    #[test]
    fn test_open_failure_shows_error_and_blocks_toggles() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2198, 3, 4, 5, 6, 7).unwrap();
        let name = crate::track::file_name(now);
        // Directories where the file should go make both attempts fail
        fs::create_dir(tmp.path().join(&name)).unwrap();
        let blocker = WorkingDirEntry::dir(&name);

        let session = session_in(tmp.path());
        let outcome = session.toggle(now);
        drop(blocker);

        assert_eq!(outcome, ToggleOutcome::OpenFailed);
        assert!(!session.is_enabled());
        assert!(session.snapshot().log_file.is_none());
        assert_eq!(session.snapshot().file_error_frames, 120);
        assert_eq!(session.toggle(at(1)), ToggleOutcome::Ignored);

        for _ in 0..120 {
            assert_eq!(session.display_frame(), StatusView::FileError);
        }
        assert_eq!(session.display_frame(), StatusView::Idle);
        assert!(matches!(session.toggle(at(2)), ToggleOutcome::Enabled(_)));
        session.shutdown();
    }

    #[test]
    fn test_fallback_directory_sticks_for_the_session() {
        let tmp = tempfile::tempdir().unwrap();
        let logs = tmp.path().join("logs");
        fs::create_dir(&logs).unwrap();
        let session = session_in(&logs);
        fs::remove_dir(&logs).unwrap();

        let first = Utc.with_ymd_and_hms(2196, 1, 1, 0, 0, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2196, 1, 1, 0, 0, 1).unwrap();
        let _first_file = WorkingDirEntry::new(crate::track::file_name(first));
        let _second_file = WorkingDirEntry::new(crate::track::file_name(second));

        let ToggleOutcome::Enabled(opened) = session.toggle(first) else {
            panic!("expected the working directory to be used");
        };
        assert!(opened.used_fallback);
        assert!(session.snapshot().directory.is_working_dir());
        session.toggle(first);

        // The resolved directory is back, but the session no longer tries it
        fs::create_dir(&logs).unwrap();
        let ToggleOutcome::Enabled(reopened) = session.toggle(second) else {
            panic!("expected logging to start");
        };
        assert!(!reopened.used_fallback);
        assert_eq!(reopened.path, PathBuf::from(crate::track::file_name(second)));
        session.shutdown();
    }

    #[test]
    fn test_error_latch_counts_down_frames() {
        let latch = ErrorLatch::default();
        assert!(!latch.consume_frame());

        latch.raise(3);
        assert!(latch.is_active());
        assert!(latch.consume_frame());
        assert!(latch.consume_frame());
        assert!(latch.consume_frame());
        assert!(!latch.is_active());
        assert!(!latch.consume_frame());
    }

    #[test]
    fn test_display_frame_prompt_and_idle() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        assert_eq!(session.display_frame(), StatusView::Idle);

        confirm_motion(&session);
        assert_eq!(
            session.display_frame(),
            StatusView::Flashing { visible: false }
        );
        session.status_tick(30.0);
        assert_eq!(
            session.display_frame(),
            StatusView::Flashing { visible: true }
        );
    }

    #[test]
    fn test_shutdown_closes_file_and_is_idempotent() {
        let tmp = tempfile::tempdir().unwrap();
        let session = session_in(tmp.path());
        let ToggleOutcome::Enabled(opened) = session.toggle(at(0)) else {
            panic!("expected logging to start");
        };

        session.shutdown();
        session.shutdown();
        assert!(!session.is_enabled());
        assert!(session.snapshot().log_file.is_none());
        assert_eq!(
            fs::read_to_string(&opened.path)
                .unwrap()
                .matches("</gpx>")
                .count(),
            1
        );
    }

    #[test]
    fn test_session_is_shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<LoggingSession>();
    }
}
