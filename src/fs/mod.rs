// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

/// What a stat call says about a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Regular,
    Directory,
    Other,
}

/// Abstract filesystem interface used at startup to vet watch candidates.
pub trait FileSystem: Send + Sync + Debug {
    /// Follows symlinks, like `stat(2)`.
    fn stat(&self, path: &Path) -> Result<FileKind>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn stat(&self, path: &Path) -> Result<FileKind> {
        let meta = fs::metadata(path).with_context(|| format!("stat {:?}", path))?;
        let ty = meta.file_type();
        Ok(if ty.is_file() {
            FileKind::Regular
        } else if ty.is_dir() {
            FileKind::Directory
        } else {
            FileKind::Other
        })
    }
}
