// src/engine/runtime.rs

use std::fmt;

use tracing::{debug, error, info, warn};

use crate::engine::core::Supervisor;
use crate::engine::{RuntimeEvent, ShutdownReport};
use crate::errors::Result;
use crate::exec::{CommandLauncher, ProcessSignaller};
use crate::signals::{SignalBridge, SupervisorSignal, TerminationSignal};
use crate::watch::ChangeSource;

/// The event loop.
///
/// Waits on the change source and the signal bridge at the same time and
/// feeds whichever is ready into the [`Supervisor`]. All state mutation
/// happens on this single task. A termination signal, or either source
/// closing, ends the loop and starts the teardown.
pub struct Runtime<C, L, S> {
    supervisor: Supervisor<L, S>,
    changes: C,
    signals: SignalBridge,
}

impl<C, L, S> fmt::Debug for Runtime<C, L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("signals", &self.signals)
            .finish_non_exhaustive()
    }
}

impl<C, L, S> Runtime<C, L, S>
where
    C: ChangeSource,
    L: CommandLauncher,
    S: ProcessSignaller,
{
    pub fn new(supervisor: Supervisor<L, S>, changes: C, signals: SignalBridge) -> Self {
        Self {
            supervisor,
            changes,
            signals,
        }
    }

    /// Run until shutdown, then tear down.
    ///
    /// Teardown order: stop dispatching, ask every tracked child to
    /// terminate, then release the change source.
    pub async fn run(self) -> Result<ShutdownReport> {
        let Runtime {
            mut supervisor,
            mut changes,
            mut signals,
        } = self;

        info!(mode = %supervisor.dispatcher().mode(), "filewatch runtime started");

        let signal = loop {
            let event = tokio::select! {
                biased;
                signal = signals.recv() => match signal {
                    Some(signal) => RuntimeEvent::Signal(signal),
                    None => RuntimeEvent::SourceClosed("signal bridge"),
                },
                ids = changes.next_changes() => match ids {
                    Some(ids) => RuntimeEvent::FilesModified(ids),
                    None => RuntimeEvent::SourceClosed("file notifications"),
                },
            };

            debug!(?event, "runtime received event");

            match event {
                RuntimeEvent::FilesModified(ids) => {
                    for watch_id in ids {
                        match changes.resolve(watch_id) {
                            Some(path) => {
                                supervisor.file_modified(path);
                            }
                            None => error!(%watch_id, "event for unknown watch id; skipped"),
                        }
                        if supervisor.output_closed() {
                            break;
                        }
                    }
                }
                RuntimeEvent::Signal(SupervisorSignal::ChildExited { pid, code }) => {
                    supervisor.child_exited(pid, code);
                }
                RuntimeEvent::Signal(SupervisorSignal::Terminate(sig)) => {
                    info!(signal = %sig, "termination requested; shutting down");
                    break Some(sig);
                }
                RuntimeEvent::SourceClosed(source) => {
                    warn!(source, "event source closed; shutting down");
                    break None;
                }
            }

            if supervisor.output_closed() {
                info!("stdout closed; shutting down as for SIGPIPE");
                break Some(TerminationSignal::Pipe);
            }
        };

        let terminated = supervisor.shutdown();
        drop(changes);

        info!("filewatch runtime exiting");
        Ok(ShutdownReport { signal, terminated })
    }
}
