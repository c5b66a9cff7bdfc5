// src/watch/backend.rs

//! Notification backend: turns "watch this path" into a [`WatchId`].
//!
//! `notify` reports changes by path. [`NotifyBackend`] issues its own
//! identifiers, one per distinct file, and keeps the reverse index so the
//! event loop only ever deals in ids.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::watch::table::WatchId;

/// Raw events as delivered by the `notify` callback thread.
pub type RawEventReceiver = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Something that can start watching a single file for modification.
pub trait WatchBackend {
    /// Begin watching `path`; registering the same path twice yields the
    /// same id.
    fn add_watch(&mut self, path: &Path) -> Result<WatchId>;
}

/// Production backend built on `notify::RecommendedWatcher`.
pub struct NotifyBackend {
    watcher: RecommendedWatcher,
    ids: HashMap<PathBuf, WatchId>,
    next_id: u64,
}

impl std::fmt::Debug for NotifyBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NotifyBackend")
            .field("watched", &self.next_id.saturating_sub(1))
            .finish_non_exhaustive()
    }
}

impl NotifyBackend {
    /// Acquire the OS notification mechanism.
    ///
    /// The callback runs on notify's own thread and only forwards events.
    pub fn new() -> crate::errors::Result<(Self, RawEventReceiver)> {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                // The receiver is gone only once the loop has shut down.
                let _ = event_tx.send(res);
            },
            Config::default(),
        )?;

        Ok((
            Self {
                watcher,
                ids: HashMap::new(),
                next_id: 1,
            },
            event_rx,
        ))
    }

    /// Map a path reported in an event back to its watch id.
    pub fn lookup(&self, path: &Path) -> Option<WatchId> {
        self.ids.get(path).copied()
    }

    /// Every spelling the backend may report for `path`.
    fn aliases(path: &Path) -> Vec<PathBuf> {
        let mut aliases = vec![path.to_path_buf()];
        if path.is_relative() {
            if let Ok(cwd) = std::env::current_dir() {
                aliases.push(cwd.join(path));
            }
        }
        if let Ok(canonical) = path.canonicalize() {
            aliases.push(canonical);
        }
        aliases
    }
}

impl WatchBackend for NotifyBackend {
    fn add_watch(&mut self, path: &Path) -> Result<WatchId> {
        let aliases = Self::aliases(path);
        if let Some(existing) = aliases.iter().find_map(|p| self.lookup(p)) {
            return Ok(existing);
        }

        self.watcher
            .watch(path, RecursiveMode::NonRecursive)
            .with_context(|| format!("watching {:?}", path))?;

        let id = WatchId::new(self.next_id);
        self.next_id += 1;
        for alias in aliases {
            self.ids.entry(alias).or_insert(id);
        }
        Ok(id)
    }
}
