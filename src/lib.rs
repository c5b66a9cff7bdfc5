// src/lib.rs

pub mod cli;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod fs;
pub mod logging;
pub mod signals;
pub mod types;
pub mod watch;

use tracing::info;

use crate::cli::CliArgs;
use crate::engine::{Runtime, ShutdownReport, Supervisor};
use crate::errors::Result;
use crate::exec::{ProcessLauncher, SigtermSignaller};
use crate::signals::SignalBridge;
use crate::watch::FileWatcher;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - the signal bridge (installed before anything can spawn)
/// - the file watcher and its watch table
/// - the process launcher and the supervisor core
/// - the event loop
pub async fn run(args: CliArgs) -> Result<ShutdownReport> {
    let command = args.command()?;
    let files = args.files();

    let signals = SignalBridge::new();
    signals.listen_for_termination()?;

    let watcher = FileWatcher::register(&files)?;

    let launcher = ProcessLauncher::new(signals.exit_notifier());
    let supervisor = Supervisor::new(
        args.mode,
        command,
        args.max_procs,
        launcher,
        SigtermSignaller,
    );

    info!(
        mode = %args.mode,
        cmd = %supervisor.dispatcher().command(),
        max_procs = args.max_procs,
        files = watcher.table().len(),
        "filewatch started"
    );

    Runtime::new(supervisor, watcher, signals).run().await
}
