// src/fs/mock.rs

use super::{FileKind, FileSystem};
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    entries: Arc<Mutex<HashMap<PathBuf, FileKind>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>) {
        self.insert(path, FileKind::Regular);
    }

    pub fn add_dir(&self, path: impl AsRef<Path>) {
        self.insert(path, FileKind::Directory);
    }

    /// Something that is neither a file nor a directory (fifo, socket...).
    pub fn add_special(&self, path: impl AsRef<Path>) {
        self.insert(path, FileKind::Other);
    }

    fn insert(&self, path: impl AsRef<Path>, kind: FileKind) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(path.as_ref().to_path_buf(), kind);
    }
}

impl FileSystem for MockFileSystem {
    fn stat(&self, path: &Path) -> Result<FileKind> {
        let entries = self.entries.lock().unwrap();
        entries
            .get(path)
            .copied()
            .ok_or_else(|| anyhow!("No such file or directory: {:?}", path))
    }
}
