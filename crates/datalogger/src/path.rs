//! Log directory resolution.
//!
//! The directory comes from the first line of a small text file. Every
//! failure falls back to the working directory, so resolution never fails.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

/// Directory in which log files are created.
///
/// The default (empty) directory means the working directory.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogDirectory(String);

impl LogDirectory {
    /// The working directory.
    #[must_use]
    pub fn working_dir() -> Self {
        Self::default()
    }

    /// Normalize a configured path and keep it if it names an existing directory.
    #[must_use]
    pub fn from_line(line: &str) -> Option<Self> {
        let dir = normalize(line)?;
        Path::new(&dir).is_dir().then_some(Self(dir))
    }

    /// Whether this is the working-directory default.
    #[must_use]
    pub fn is_working_dir(&self) -> bool {
        self.0.is_empty()
    }

    /// The directory as written, always ending in `/` unless it is the default.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path of `file_name` inside this directory.
    #[must_use]
    pub fn join(&self, file_name: &str) -> PathBuf {
        PathBuf::from(format!("{}{file_name}", self.0))
    }
}

impl std::fmt::Display for LogDirectory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_working_dir() {
            f.write_str("./")
        } else {
            f.write_str(&self.0)
        }
    }
}

/// Resolves the log directory from the path file.
#[derive(Debug, Clone)]
pub struct PathResolver {
    path_file: PathBuf,
}

impl PathResolver {
    /// Create a resolver reading `path_file`.
    #[must_use]
    pub fn new(path_file: impl Into<PathBuf>) -> Self {
        Self {
            path_file: path_file.into(),
        }
    }

    /// The file this resolver reads.
    #[must_use]
    pub fn path_file(&self) -> &Path {
        &self.path_file
    }

    /// Resolve the log directory, falling back to the working directory.
    #[must_use]
    pub fn resolve(&self) -> LogDirectory {
        let contents = match fs::read_to_string(&self.path_file) {
            Ok(contents) => contents,
            Err(e) => {
                debug!(
                    "No usable path file at {} ({e}), logging to working directory",
                    self.path_file.display()
                );
                return LogDirectory::working_dir();
            }
        };

        let line = contents.lines().next().unwrap_or_default();
        match LogDirectory::from_line(line) {
            Some(dir) => {
                debug!("Logging to {dir}");
                dir
            }
            None => {
                debug!(
                    "Path file {} does not name an existing directory ({line:?}), \
                     logging to working directory",
                    self.path_file.display()
                );
                LogDirectory::working_dir()
            }
        }
    }
}

/// Forward slashes only, with a trailing separator. `None` for a blank line.
fn normalize(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    let mut dir = line.replace('\\', "/");
    if !dir.ends_with('/') {
        dir.push('/');
    }
    Some(dir)
}
