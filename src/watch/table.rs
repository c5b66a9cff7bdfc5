// src/watch/table.rs

//! Watch identifier → path table, built once at startup.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::errors::{FilewatchError, Result};
use crate::fs::{FileKind, FileSystem};
use crate::watch::backend::WatchBackend;

/// Opaque token issued by the notification backend for one watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WatchId(u64);

impl WatchId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEntry {
    pub watch_id: WatchId,
    pub path: PathBuf,
}

/// Immutable mapping from [`WatchId`] to the file it denotes.
///
/// Only [`WatchTable::register`] can populate it, so every id the loop sees
/// was issued before the loop started.
#[derive(Debug, Default)]
pub struct WatchTable {
    entries: BTreeMap<WatchId, PathBuf>,
}

impl WatchTable {
    /// Stat every candidate and register the regular files with `backend`.
    ///
    /// Paths that cannot be stat'ed, are not regular files, or are refused by
    /// the backend are skipped with a warning. Fails with
    /// [`FilewatchError::NoFilesWatched`] when nothing could be registered.
    pub fn register(
        paths: &[PathBuf],
        fs: &dyn FileSystem,
        backend: &mut dyn WatchBackend,
    ) -> Result<Self> {
        let mut entries = BTreeMap::new();

        for path in paths {
            match fs.stat(path) {
                Ok(FileKind::Regular) => {}
                Ok(kind) => {
                    warn!(path = %path.display(), ?kind, "not a regular file, ignored");
                    continue;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "can not stat, ignored");
                    continue;
                }
            }

            match backend.add_watch(path) {
                Ok(watch_id) => {
                    if entries.contains_key(&watch_id) {
                        debug!(path = %path.display(), %watch_id, "already watched");
                        continue;
                    }
                    debug!(path = %path.display(), %watch_id, "watch added");
                    entries.insert(watch_id, path.clone());
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "error adding watch, ignored");
                }
            }
        }

        if entries.is_empty() {
            return Err(FilewatchError::NoFilesWatched);
        }

        info!(count = entries.len(), "watching files for modification");
        Ok(Self { entries })
    }

    pub fn resolve(&self, watch_id: WatchId) -> Option<&Path> {
        self.entries.get(&watch_id).map(PathBuf::as_path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = WatchEntry> + '_ {
        self.entries.iter().map(|(id, path)| WatchEntry {
            watch_id: *id,
            path: path.clone(),
        })
    }
}
