// src/exec/mod.rs

//! Process execution layer.
//!
//! - [`registry`] tracks the live children within a fixed capacity.
//! - [`launcher`] provides the `CommandLauncher` trait and the
//!   `tokio::process` implementation used in production.
//! - [`signaller`] delivers termination requests to pids.

pub mod launcher;
pub mod registry;
pub mod signaller;

pub use launcher::{CommandLauncher, ProcessLauncher};
pub use registry::{ChildRegistry, TrackedChild, DEFAULT_MAX_PROCS};
pub use signaller::{ProcessSignaller, SigtermSignaller};
