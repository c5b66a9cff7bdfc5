// src/engine/core.rs

//! Synchronous supervisor core.
//!
//! Owns the [`ChildRegistry`] and the [`ModeDispatcher`] and is driven one
//! event at a time by the runtime. It has no channels and never waits, so
//! it can be unit tested with fake launchers and signallers.

use std::fmt;
use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, info, warn};

use crate::engine::dispatcher::{DispatchOutcome, ModeDispatcher};
use crate::engine::Phase;
use crate::exec::{ChildRegistry, CommandLauncher, ProcessSignaller};
use crate::types::{Command, ExecutionMode};

pub struct Supervisor<L, S> {
    registry: ChildRegistry,
    dispatcher: ModeDispatcher<L, S>,
    phase: Phase,
    /// Destination of the `[pid] ...` status lines.
    out: Box<dyn Write + Send>,
    output_closed: bool,
}

impl<L: fmt::Debug, S: fmt::Debug> fmt::Debug for Supervisor<L, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Supervisor")
            .field("registry", &self.registry)
            .field("dispatcher", &self.dispatcher)
            .field("phase", &self.phase)
            .field("output_closed", &self.output_closed)
            .finish_non_exhaustive()
    }
}

impl<L: CommandLauncher, S: ProcessSignaller> Supervisor<L, S> {
    pub fn new(
        mode: ExecutionMode,
        command: Command,
        max_procs: usize,
        launcher: L,
        signaller: S,
    ) -> Self {
        Self {
            registry: ChildRegistry::new(max_procs),
            dispatcher: ModeDispatcher::new(mode, command, launcher, signaller),
            phase: Phase::Running,
            out: Box::new(io::stdout()),
            output_closed: false,
        }
    }

    /// Write status lines somewhere other than stdout.
    pub fn with_output(mut self, out: impl Write + Send + 'static) -> Self {
        self.out = Box::new(out);
        self
    }

    pub fn registry(&self) -> &ChildRegistry {
        &self.registry
    }

    pub fn dispatcher(&self) -> &ModeDispatcher<L, S> {
        &self.dispatcher
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// The reader of the status lines went away (`EPIPE`). The runtime
    /// treats this like `SIGPIPE`.
    pub fn output_closed(&self) -> bool {
        self.output_closed
    }

    /// A watched file was modified.
    pub fn file_modified(&mut self, path: &Path) -> DispatchOutcome {
        if self.phase == Phase::ShuttingDown {
            return DispatchOutcome::Ignored;
        }
        let outcome = self.dispatcher.file_modified(path, &mut self.registry);
        match &outcome {
            DispatchOutcome::Launched { pid } => {
                self.status(format_args!("[{pid}] {} has been modified.", path.display()));
            }
            DispatchOutcome::Queued { pending } => {
                debug!(path = %path.display(), pending, "waiting for previous invocation");
            }
            DispatchOutcome::Rejected { .. }
            | DispatchOutcome::Failed { .. }
            | DispatchOutcome::Ignored => {}
        }
        outcome
    }

    /// A child exited. Unknown pids are ignored.
    pub fn child_exited(&mut self, pid: u32, code: Option<i32>) -> Vec<DispatchOutcome> {
        if !self.registry.remove(pid) {
            debug!(pid, "exit of untracked child");
        }
        self.status(format_args!("[{pid}] done."));
        info!(pid, ?code, running = self.registry.count(), "child exited");

        if self.phase == Phase::ShuttingDown {
            return Vec::new();
        }
        let outcomes = self.dispatcher.child_exited(pid, &mut self.registry);
        for outcome in &outcomes {
            debug!(?outcome, "dequeued event dispatched");
        }
        outcomes
    }

    /// Ask every tracked child to terminate and stop dispatching.
    ///
    /// Every tracked child is asked again, including those an Override
    /// sweep already signalled. Returns the number of requests sent.
    /// Idempotent.
    pub fn shutdown(&mut self) -> usize {
        if self.phase == Phase::ShuttingDown {
            return 0;
        }
        self.phase = Phase::ShuttingDown;
        let terminated = self.dispatcher.terminate_all(&mut self.registry);
        let forgotten = self.registry.clear();
        info!(terminated, forgotten, "children signalled for shutdown");
        terminated
    }

    fn status(&mut self, line: fmt::Arguments<'_>) {
        if self.output_closed {
            return;
        }
        let written = writeln!(self.out, "{line}").and_then(|()| self.out.flush());
        match written {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                warn!("stdout closed");
                self.output_closed = true;
            }
            Err(err) => warn!(error = %err, "failed to write status line"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::Result;
    use std::sync::{Arc, Mutex};

    struct Counter(u32);

    impl CommandLauncher for Counter {
        fn launch(&mut self, _command: &Command, _trigger: &Path) -> Result<u32> {
            self.0 += 1;
            Ok(self.0)
        }
    }

    #[derive(Clone, Default)]
    struct Shared(Arc<Mutex<Vec<u32>>>);

    impl ProcessSignaller for Shared {
        fn terminate(&self, pid: u32) -> Result<()> {
            self.0.lock().unwrap().push(pid);
            Ok(())
        }
    }

    /// Accepts everything written to it.
    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    /// A pipe whose reader has gone away.
    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    struct Unwritable;

    impl Write for Unwritable {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("disk full"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn supervisor(mode: ExecutionMode, max: usize) -> (Supervisor<Counter, Shared>, Shared) {
        let signalled = Shared::default();
        let cmd = Command::parse("echo hi").unwrap();
        let sup = Supervisor::new(mode, cmd, max, Counter(0), signalled.clone())
            .with_output(Captured::default());
        (sup, signalled)
    }

    #[test]
    fn exits_free_registry_slots() {
        let (mut sup, _) = supervisor(ExecutionMode::Concurrent, 1);
        assert_eq!(sup.file_modified(Path::new("a")), DispatchOutcome::Launched { pid: 1 });
        assert_eq!(sup.file_modified(Path::new("a")), DispatchOutcome::Rejected { capacity: 1 });

        sup.child_exited(1, Some(0));
        assert!(sup.registry().is_empty());
        assert_eq!(sup.file_modified(Path::new("a")), DispatchOutcome::Launched { pid: 2 });
    }

    #[test]
    fn exit_of_unknown_pid_changes_nothing() {
        let (mut sup, _) = supervisor(ExecutionMode::Concurrent, 4);
        sup.file_modified(Path::new("a"));
        assert!(sup.child_exited(42, None).is_empty());
        assert_eq!(sup.registry().pids(), [1]);
    }

    #[test]
    fn shutdown_signals_children_and_ignores_later_events() {
        let (mut sup, signalled) = supervisor(ExecutionMode::Concurrent, 4);
        sup.file_modified(Path::new("a"));
        sup.file_modified(Path::new("b"));

        assert_eq!(sup.shutdown(), 2);
        assert_eq!(*signalled.0.lock().unwrap(), [1, 2]);
        assert!(sup.registry().is_empty());
        assert_eq!(sup.phase(), Phase::ShuttingDown);

        assert_eq!(sup.file_modified(Path::new("a")), DispatchOutcome::Ignored);
        assert!(sup.child_exited(1, Some(143)).is_empty());
        assert_eq!(sup.shutdown(), 0);
    }

    #[test]
    fn single_mode_runs_queued_events_after_exit() {
        let (mut sup, _) = supervisor(ExecutionMode::Single, 4);
        sup.file_modified(Path::new("a.txt"));
        sup.file_modified(Path::new("b.txt"));
        assert_eq!(sup.registry().pids(), [1]);

        let outcomes = sup.child_exited(1, Some(0));
        assert_eq!(outcomes, [DispatchOutcome::Launched { pid: 2 }]);
        assert_eq!(sup.registry().pids(), [2]);
    }

    #[test]
    fn status_lines_report_launches_and_exits() {
        let out = Captured::default();
        let (sup, _) = supervisor(ExecutionMode::Concurrent, 4);
        let mut sup = sup.with_output(out.clone());

        sup.file_modified(Path::new("notes.txt"));
        sup.child_exited(1, Some(0));

        assert_eq!(out.text(), "[1] notes.txt has been modified.\n[1] done.\n");
    }

    #[test]
    fn broken_pipe_marks_output_closed_without_stopping_children() {
        let (sup, signalled) = supervisor(ExecutionMode::Concurrent, 4);
        let mut sup = sup.with_output(ClosedPipe);

        assert_eq!(sup.file_modified(Path::new("a")), DispatchOutcome::Launched { pid: 1 });
        assert!(sup.output_closed());
        assert_eq!(sup.phase(), Phase::Running);

        // teardown is still the regular one
        assert_eq!(sup.shutdown(), 1);
        assert_eq!(*signalled.0.lock().unwrap(), [1]);
    }

    #[test]
    fn other_write_errors_are_ignored() {
        let (sup, _) = supervisor(ExecutionMode::Concurrent, 4);
        let mut sup = sup.with_output(Unwritable);

        sup.file_modified(Path::new("a"));
        sup.child_exited(1, Some(0));
        assert!(!sup.output_closed());
        assert!(sup.registry().is_empty());
    }
}
