use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use quick_xml::Writer;
use tracing::{debug, info, warn};

use super::{file_name, write_epilog, write_prolog, write_track_point};
use crate::error::{Error, Result};
use crate::path::LogDirectory;
use crate::telemetry::Position;

/// Result of a successful [`TrackWriter::open`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Opened {
    /// Path of the file now being written.
    pub path: PathBuf,
    /// True when the requested directory failed and the working directory was used.
    pub used_fallback: bool,
}

/// Writes one GPX track file at a time.
///
/// Consecutive identical positions are written once. Every write goes
/// straight to the file so a crash of the host loses at most the epilog.
pub struct TrackWriter {
    track_name: String,
    file: Option<Writer<File>>,
    path: Option<PathBuf>,
    last_position: Option<Position>,
    points_written: u64,
}

impl TrackWriter {
    /// Create a writer with no file open.
    #[must_use]
    pub fn new(track_name: impl Into<String>) -> Self {
        Self {
            track_name: track_name.into(),
            file: None,
            path: None,
            last_position: None,
            points_written: 0,
        }
    }

    /// Open a new log file in `directory`, finalizing any file already open.
    ///
    /// If the file cannot be created in `directory`, the same name is tried
    /// once in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LogFileOpen`] when both attempts fail. Nothing is
    /// written in that case.
    pub fn open(&mut self, directory: &LogDirectory, now: DateTime<Utc>) -> Result<Opened> {
        if let Err(e) = self.close() {
            warn!("Failed to finalize previous log file: {e}");
        }

        let name = file_name(now);
        let primary = directory.join(&name);

        let (file, path, used_fallback) = match append(&primary) {
            Ok(file) => (file, primary, false),
            Err(e) if directory.is_working_dir() => {
                return Err(Error::LogFileOpen {
                    fallback: primary.clone(),
                    path: primary,
                    source: e,
                });
            }
            Err(e) => {
                warn!(
                    "Unable to open {} ({e}), trying the working directory",
                    primary.display()
                );
                let fallback = PathBuf::from(&name);
                match append(&fallback) {
                    Ok(file) => (file, fallback, true),
                    Err(source) => {
                        return Err(Error::LogFileOpen {
                            path: primary,
                            fallback,
                            source,
                        });
                    }
                }
            }
        };

        self.path = Some(path.clone());
        self.last_position = None;
        self.points_written = 0;

        let xml = self.file.insert(Writer::new(file));
        if let Err(e) = write_prolog(xml, now, &self.track_name) {
            warn!("Failed to write prolog to {}: {e}", path.display());
        }

        info!("Logging to {}", path.display());
        Ok(Opened {
            path,
            used_fallback,
        })
    }

    /// Append a track point unless `position` repeats the last one written.
    ///
    /// Returns whether a point was written. Without an open file this is a
    /// no-op returning `false`.
    ///
    /// # Errors
    ///
    /// Returns the write error if the point cannot be written; the cache is
    /// left untouched so the same position is tried again next time.
    pub fn record(&mut self, position: Position, time: DateTime<Utc>) -> Result<bool> {
        let Some(xml) = self.file.as_mut() else {
            return Ok(false);
        };
        if self.last_position == Some(position) {
            return Ok(false);
        }

        write_track_point(xml, &position, time)?;
        self.last_position = Some(position);
        self.points_written += 1;
        Ok(true)
    }

    /// Write the epilog and release the file. Does nothing if no file is open.
    ///
    /// # Errors
    ///
    /// Returns the write error if the epilog cannot be written; the file is
    /// released regardless.
    pub fn close(&mut self) -> Result<()> {
        let Some(mut xml) = self.file.take() else {
            return Ok(());
        };

        let result = write_epilog(&mut xml);
        if let Some(path) = self.path.take() {
            debug!(
                "Closed {} after {} track points",
                path.display(),
                self.points_written
            );
        }
        self.last_position = None;
        self.points_written = 0;
        result
    }

    /// Whether a file is currently open.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Path of the open file, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Track points written to the open file.
    #[must_use]
    pub fn points_written(&self) -> u64 {
        self.points_written
    }
}

impl std::fmt::Debug for TrackWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackWriter")
            .field("track_name", &self.track_name)
            .field("path", &self.path)
            .field("last_position", &self.last_position)
            .field("points_written", &self.points_written)
            .finish_non_exhaustive()
    }
}

impl Drop for TrackWriter {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!("Failed to finalize log file on drop: {e}");
        }
    }
}

fn append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}
