//! Logging for datalogger.
//!
//! The core only emits `tracing` events under the `datalogger` target. The
//! `datalog` binary sends them to stderr so stdout stays free for command
//! output; a host adapter passes its own writer (usually the simulator's log
//! file) to [`init_logging_with_writer`].

use std::io;

use tracing::{Level, Subscriber};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Target prefix of every event this crate emits.
pub const LOG_TARGET: &str = "datalogger";

/// Verbosity level for logging output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Enable/disable and file events.
    #[default]
    Normal,
    /// Also fallbacks and state transitions.
    Verbose,
    /// Everything.
    Trace,
}

impl Verbosity {
    /// Most detailed level shown.
    #[must_use]
    pub fn level(self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::INFO,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }

    /// Filter directive showing this crate's events at this level and
    /// nothing from other crates.
    #[must_use]
    pub fn directive(self) -> String {
        format!("{LOG_TARGET}={}", self.level())
    }
}

/// `RUST_LOG` if set and valid, otherwise the directive for `verbosity`.
#[must_use]
pub fn env_filter(verbosity: Verbosity) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(verbosity.directive()))
}

/// Formatted events from `filter` written to `writer`.
pub fn subscriber<W>(filter: EnvFilter, writer: W, ansi: bool) -> impl Subscriber + Send + Sync + 'static
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(writer)
            .with_ansi(ansi)
            .with_target(true),
    )
}

/// Send logs to stderr.
///
/// Returns `false` if a global subscriber was already installed.
///
/// # Examples
///
/// ```no_run
/// use datalogger::{init_logging, logging::Verbosity};
///
/// init_logging(Verbosity::Verbose);
/// ```
pub fn init_logging(verbosity: Verbosity) -> bool {
    init_logging_with_writer(verbosity, io::stderr, true)
}

/// Send logs to `writer`. Pass `ansi = false` when the output is a file.
///
/// Returns `false` if a global subscriber was already installed, which is
/// normal when the host process sets one up itself.
pub fn init_logging_with_writer<W>(verbosity: Verbosity, writer: W, ansi: bool) -> bool
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    subscriber(env_filter(verbosity), writer, ansi)
        .try_init()
        .is_ok()
}

/// Route warnings from the code under test through the test harness.
#[cfg(test)]
pub fn init_test_logging() {
    let filter = EnvFilter::new(format!("{LOG_TARGET}=warn"));
    let _ = subscriber(filter, fmt::TestWriter::new, false).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_directive() {
        assert_eq!(Verbosity::Quiet.directive(), "datalogger=ERROR");
        assert_eq!(Verbosity::Normal.directive(), "datalogger=INFO");
        assert_eq!(Verbosity::Verbose.level(), Level::DEBUG);
        assert_eq!(Verbosity::Trace.level(), Level::TRACE);
        assert_eq!(Verbosity::default(), Verbosity::Normal);
    }

    #[test]
    fn test_subscriber_keeps_only_crate_events_at_level() {
        let captured = Captured::default();
        let sink = captured.clone();
        let filter = EnvFilter::new(Verbosity::Normal.directive());

        tracing::subscriber::with_default(subscriber(filter, move || sink.clone(), false), || {
            tracing::info!(target: "datalogger::session", "Logging enabled");
            tracing::debug!(target: "datalogger::motion", "Motion BecameMoving");
            tracing::info!(target: "other_crate", "unrelated");
        });

        let text = captured.text();
        assert!(text.contains("Logging enabled"));
        assert!(text.contains("datalogger::session"));
        assert!(!text.contains("BecameMoving"));
        assert!(!text.contains("unrelated"));
        assert!(!text.contains('\u{1b}'));
    }

    #[test]
    fn test_init_logging_installs_once() {
        init_test_logging();
        // The test subscriber is already global
        assert!(!init_logging(Verbosity::Verbose));
        assert!(!init_logging_with_writer(Verbosity::Trace, io::sink, false));
    }
}
