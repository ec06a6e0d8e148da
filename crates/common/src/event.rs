// Filesystem change events delivered by the watcher to the push handler.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// What happened to a path. The push handler treats every kind the same way;
/// the distinction exists for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FsEventKind {
    /// Path was created.
    Created,
    /// Path content or metadata changed.
    Modified,
    /// Path was deleted.
    Deleted,
    /// Path was renamed or moved. The event carries the destination.
    Moved,
}

impl FsEventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Moved => "moved",
        }
    }
}

impl fmt::Display for FsEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single change under the watched root.
///
/// Produced once by the watcher, consumed once by the handler, then dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FsEvent {
    pub kind: FsEventKind,
    pub path: PathBuf,
    pub is_directory: bool,
}

impl FsEvent {
    pub fn new(kind: FsEventKind, path: impl Into<PathBuf>, is_directory: bool) -> Self {
        Self { kind, path: path.into(), is_directory }
    }

    /// Event for a regular file (or anything that is not a directory).
    pub fn file(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self::new(kind, path, false)
    }

    pub fn directory(kind: FsEventKind, path: impl Into<PathBuf>) -> Self {
        Self::new(kind, path, true)
    }

    pub fn is_file(&self) -> bool {
        !self.is_directory
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
