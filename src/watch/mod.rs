// src/watch/mod.rs

//! File watching.
//!
//! This module is responsible for:
//! - vetting the startup paths and registering them with `notify`
//!   ([`table`], [`backend`]);
//! - owning the notification handle for the lifetime of the process
//!   ([`watcher`]);
//! - yielding batches of modified [`WatchId`]s to the event loop through
//!   [`ChangeSource`].
//!
//! It does not know about execution modes or child processes.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

pub mod backend;
pub mod table;
pub mod watcher;

pub use backend::{NotifyBackend, WatchBackend};
pub use table::{WatchEntry, WatchId, WatchTable};
pub use watcher::FileWatcher;

/// Source of "path modified" notifications, keyed by watch id.
///
/// Production code uses [`FileWatcher`]; tests can feed scripted ids.
pub trait ChangeSource: Send {
    /// Wait until at least one watched file was modified.
    ///
    /// Returns `None` once the source can no longer deliver events.
    fn next_changes(&mut self) -> Pin<Box<dyn Future<Output = Option<Vec<WatchId>>> + Send + '_>>;

    /// Path registered under `watch_id`.
    fn resolve(&self, watch_id: WatchId) -> Option<&Path>;
}
