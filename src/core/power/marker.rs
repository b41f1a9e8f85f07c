//! Power-state marker file
//!
//! The "system is powered on" flag lives on disk as the presence of a
//! zero-byte file. There is no locking; two concurrent invocations can race.

use std::fs::OpenOptions;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Default marker file name, relative to the working directory
pub const DEFAULT_MARKER: &str = "on";

/// Marker file handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerFile {
    path: PathBuf,
}

impl Default for MarkerFile {
    fn default() -> Self {
        Self::new(DEFAULT_MARKER)
    }
}

impl MarkerFile {
    /// Marker at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Marker file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the marker is present
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Create the marker if absent. Returns `true` if it was created.
    pub fn create(&self) -> std::io::Result<bool> {
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(_) => {
                tracing::debug!("Created marker {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Remove the marker if present. Returns `true` if it was removed.
    pub fn remove(&self) -> std::io::Result<bool> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::debug!("Removed marker {}", self.path.display());
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let marker = MarkerFile::new(dir.path().join("on"));

        assert!(!marker.exists());
        assert!(marker.create().unwrap());
        assert!(marker.exists());
        assert_eq!(std::fs::metadata(marker.path()).unwrap().len(), 0);

        // Second create leaves the existing file alone
        assert!(!marker.create().unwrap());

        assert!(marker.remove().unwrap());
        assert!(!marker.exists());
        assert!(!marker.remove().unwrap());
    }

    #[test]
    fn test_default_path() {
        assert_eq!(MarkerFile::default().path(), Path::new("on"));
    }

    #[test]
    fn test_create_in_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let marker = MarkerFile::new(dir.path().join("missing").join("on"));
        assert!(marker.create().is_err());
    }
}
