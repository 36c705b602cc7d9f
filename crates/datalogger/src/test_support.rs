//! Helpers shared by the unit tests.

use std::fs;
use std::path::{Path, PathBuf};

use crate::path::{LogDirectory, PathResolver};

/// Resolve `path` through a path file kept outside it.
pub(crate) fn log_directory(path: &Path) -> LogDirectory {
    let holder = tempfile::tempdir().unwrap();
    let path_file = holder.path().join("DataLogPath.txt");
    fs::write(&path_file, path.to_string_lossy().as_bytes()).unwrap();
    PathResolver::new(path_file).resolve()
}

/// A file or directory in the working directory, removed on drop even when
/// the test fails.
pub(crate) struct WorkingDirEntry(PathBuf);

impl WorkingDirEntry {
    /// Track `name`, whatever ends up being created there.
    pub(crate) fn new(name: impl Into<PathBuf>) -> Self {
        Self(name.into())
    }

    /// Create a directory called `name`.
    pub(crate) fn dir(name: impl Into<PathBuf>) -> Self {
        let entry = Self::new(name);
        fs::create_dir(&entry.0).unwrap();
        entry
    }
}

impl Drop for WorkingDirEntry {
    fn drop(&mut self) {
        if self.0.is_dir() {
            let _ = fs::remove_dir(&self.0);
        } else {
            let _ = fs::remove_file(&self.0);
        }
    }
}
