//! Environment sentinel
//!
//! The bootstrap task is expensive and only needs to succeed once per build
//! root. Its completion is recorded as a marker file under the build root.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Marker file name, relative to the build root
pub const SENTINEL_FILE: &str = ".env-ready";

/// Marker-file store for the one-time environment bootstrap
#[derive(Debug, Clone)]
pub struct SentinelStore {
    file_name: String,
}

impl SentinelStore {
    pub fn new() -> Self {
        SentinelStore {
            file_name: SENTINEL_FILE.to_string(),
        }
    }

    /// Use a different marker file name
    pub fn with_file_name(file_name: impl Into<String>) -> Self {
        SentinelStore {
            file_name: file_name.into(),
        }
    }

    /// Path of the marker for a build root
    pub fn marker(&self, build_root: &Path) -> PathBuf {
        build_root.join(&self.file_name)
    }

    /// Whether the bootstrap already completed for this build root
    pub fn exists(&self, build_root: &Path) -> bool {
        self.marker(build_root).is_file()
    }

    /// Record completion. Marking an already-marked root is a no-op.
    pub fn mark(&self, build_root: &Path) -> io::Result<()> {
        fs::create_dir_all(build_root)?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.marker(build_root))?;
        Ok(())
    }
}

impl Default for SentinelStore {
    fn default() -> Self {
        Self::new()
    }
}
