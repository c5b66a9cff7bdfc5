// src/watch/watcher.rs

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use notify::event::ModifyKind;
use notify::{Event, EventKind};
use tracing::{info, trace, warn};

use crate::errors::Result;
use crate::fs::RealFileSystem;
use crate::watch::backend::{NotifyBackend, RawEventReceiver};
use crate::watch::table::{WatchId, WatchTable};
use crate::watch::ChangeSource;

/// Owns the notification handle together with the watch table.
///
/// Constructed once at startup; dropping it removes every watch, which the
/// runtime does exactly once after the children have been signalled.
#[derive(Debug)]
pub struct FileWatcher {
    backend: NotifyBackend,
    table: WatchTable,
    events: RawEventReceiver,
}

impl FileWatcher {
    /// Acquire the backend and register every regular file in `paths`.
    pub fn register(paths: &[PathBuf]) -> Result<Self> {
        let (mut backend, events) = NotifyBackend::new()?;
        let table = WatchTable::register(paths, &RealFileSystem, &mut backend)?;
        Ok(Self {
            backend,
            table,
            events,
        })
    }

    pub fn table(&self) -> &WatchTable {
        &self.table
    }

    /// Watch ids whose content was modified according to `event`.
    fn modified_ids(&self, event: &Event) -> Vec<WatchId> {
        if !is_content_modification(&event.kind) {
            return Vec::new();
        }
        let mut ids = Vec::new();
        for path in &event.paths {
            match self.backend.lookup(path) {
                Some(id) if !ids.contains(&id) => ids.push(id),
                Some(_) => {}
                None => trace!(?path, "event for unwatched path"),
            }
        }
        ids
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        info!(count = self.table.len(), "releasing file watches");
    }
}

impl ChangeSource for FileWatcher {
    fn next_changes(&mut self) -> Pin<Box<dyn Future<Output = Option<Vec<WatchId>>> + Send + '_>> {
        Box::pin(async move {
            loop {
                let received = match self.events.recv().await {
                    Some(received) => received,
                    None => return None,
                };
                match received {
                    Ok(event) => {
                        let ids = self.modified_ids(&event);
                        if !ids.is_empty() {
                            return Some(ids);
                        }
                        trace!(kind = ?event.kind, "ignoring notify event");
                    }
                    Err(err) => warn!(error = %err, "file watch error"),
                }
            }
        })
    }

    fn resolve(&self, watch_id: WatchId) -> Option<&Path> {
        self.table.resolve(watch_id)
    }
}

fn is_content_modification(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any)
    )
}
