// src/engine/mod.rs

//! Supervisor engine.
//!
//! - [`dispatcher`] applies the execution mode around each launch.
//! - [`core`] owns the child registry and the dispatcher and reacts to one
//!   event at a time, without IO of its own.
//! - [`runtime`] is the async loop multiplexing file changes and signals.

use crate::signals::{SupervisorSignal, TerminationSignal};
use crate::watch::WatchId;

/// Lifecycle of the supervisor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Running,
    /// Terminal: children were signalled, nothing new is launched.
    ShuttingDown,
}

/// One ready item taken from the multiplexed sources.
#[derive(Debug, Clone)]
pub enum RuntimeEvent {
    FilesModified(Vec<WatchId>),
    Signal(SupervisorSignal),
    SourceClosed(&'static str),
}

/// How the loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownReport {
    /// `None` when a source closed instead.
    pub signal: Option<TerminationSignal>,
    /// Termination requests sent during teardown.
    pub terminated: usize,
}

pub mod core;
pub mod dispatcher;
pub mod runtime;

pub use self::core::Supervisor;
pub use dispatcher::{DispatchOutcome, ModeDispatcher};
pub use runtime::Runtime;
