// src/engine/dispatcher.rs

//! Execution-mode policy applied around every launch.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::exec::{ChildRegistry, CommandLauncher, ProcessSignaller};
use crate::types::{Command, ExecutionMode};

/// What happened to one modification event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A child was started and registered.
    Launched { pid: u32 },
    /// Single mode: another invocation is outstanding; `pending` events now
    /// wait in line, this one included.
    Queued { pending: usize },
    /// The registry is full; the event was dropped.
    Rejected { capacity: usize },
    /// The spawn itself failed; no child was started this round.
    Failed { reason: String },
    /// The supervisor is shutting down.
    Ignored,
}

/// Applies the [`ExecutionMode`] to each modification event.
///
/// - `Single`: at most one invocation outstanding. Events arriving while it
///   runs are kept in FIFO order and launched one by one, each only after
///   the exit of that specific previous pid. The loop is never stalled.
/// - `Concurrent`: launch without waiting while the registry has room,
///   otherwise drop the event.
/// - `Override`: ask every tracked child to terminate, then launch and
///   register the new one, which is therefore never part of the sweep.
///   The event is never dropped: when children that ignore the request
///   fill the registry, the oldest of them stops being tracked.
///
/// The registry is owned by the caller and lent to every call.
#[derive(Debug)]
pub struct ModeDispatcher<L, S> {
    mode: ExecutionMode,
    command: Command,
    launcher: L,
    signaller: S,
    pending: VecDeque<PathBuf>,
    outstanding: Option<u32>,
}

impl<L: CommandLauncher, S: ProcessSignaller> ModeDispatcher<L, S> {
    pub fn new(mode: ExecutionMode, command: Command, launcher: L, signaller: S) -> Self {
        Self {
            mode,
            command,
            launcher,
            signaller,
            pending: VecDeque::new(),
            outstanding: None,
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn command(&self) -> &Command {
        &self.command
    }

    pub fn signaller(&self) -> &S {
        &self.signaller
    }

    /// Single-mode events waiting for the outstanding invocation.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Single-mode invocation currently holding the line.
    pub fn outstanding(&self) -> Option<u32> {
        self.outstanding
    }

    pub fn file_modified(&mut self, path: &Path, registry: &mut ChildRegistry) -> DispatchOutcome {
        match self.mode {
            ExecutionMode::Single => {
                if let Some(pid) = self.outstanding {
                    self.pending.push_back(path.to_path_buf());
                    debug!(
                        path = %path.display(),
                        waiting_on = pid,
                        pending = self.pending.len(),
                        "invocation outstanding; queued"
                    );
                    DispatchOutcome::Queued {
                        pending: self.pending.len(),
                    }
                } else {
                    self.launch_single(path, registry)
                }
            }
            ExecutionMode::Concurrent => self.launch(path, registry),
            ExecutionMode::Override => {
                let terminated = registry.kill_unsignalled(&self.signaller);
                if terminated > 0 {
                    info!(terminated, "override: asked previous invocations to terminate");
                }
                if registry.is_full() {
                    if let Some(pid) = registry.evict_signalled() {
                        warn!(pid, "override: registry full; no longer tracking previous invocation");
                    }
                }
                self.spawn(path, registry)
            }
        }
    }

    /// React to the exit of `pid`, already removed from `registry`.
    ///
    /// In Single mode the exit of the outstanding pid releases the queue;
    /// queued events whose launch fails are consumed until one starts.
    pub fn child_exited(&mut self, pid: u32, registry: &mut ChildRegistry) -> Vec<DispatchOutcome> {
        if self.outstanding != Some(pid) {
            return Vec::new();
        }
        self.outstanding = None;

        let mut outcomes = Vec::new();
        while self.outstanding.is_none() {
            let Some(next) = self.pending.pop_front() else {
                break;
            };
            outcomes.push(self.launch_single(&next, registry));
        }
        outcomes
    }

    /// Teardown: forget queued events and ask every tracked child to stop.
    pub fn terminate_all(&mut self, registry: &mut ChildRegistry) -> usize {
        if !self.pending.is_empty() {
            debug!(dropped = self.pending.len(), "discarding queued events");
        }
        self.pending.clear();
        self.outstanding = None;
        registry.kill_all(&self.signaller)
    }

    fn launch_single(&mut self, path: &Path, registry: &mut ChildRegistry) -> DispatchOutcome {
        let outcome = self.launch(path, registry);
        if let DispatchOutcome::Launched { pid } = outcome {
            self.outstanding = Some(pid);
        }
        outcome
    }

    fn launch(&mut self, path: &Path, registry: &mut ChildRegistry) -> DispatchOutcome {
        if registry.is_full() {
            warn!(
                capacity = registry.capacity(),
                path = %path.display(),
                "max number of processes reached ({}); event dropped",
                registry.count()
            );
            return DispatchOutcome::Rejected {
                capacity: registry.capacity(),
            };
        }
        self.spawn(path, registry)
    }

    fn spawn(&mut self, path: &Path, registry: &mut ChildRegistry) -> DispatchOutcome {
        match self.launcher.launch(&self.command, path) {
            Ok(pid) => {
                if !registry.add(pid) {
                    warn!(pid, "could not track child");
                }
                DispatchOutcome::Launched { pid }
            }
            Err(err) => {
                error!(path = %path.display(), cmd = %self.command, error = %err, "launch failed");
                DispatchOutcome::Failed {
                    reason: err.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{FilewatchError, Result};
    use std::sync::Mutex;

    #[derive(Default)]
    struct Pids {
        next: u32,
        fail_next: bool,
    }

    impl CommandLauncher for Pids {
        fn launch(&mut self, _command: &Command, _trigger: &Path) -> Result<u32> {
            if std::mem::take(&mut self.fail_next) {
                return Err(FilewatchError::Other(anyhow::anyhow!("boom")));
            }
            self.next += 1;
            Ok(100 + self.next)
        }
    }

    #[derive(Default)]
    struct Terminated(Mutex<Vec<u32>>);

    impl ProcessSignaller for Terminated {
        fn terminate(&self, pid: u32) -> Result<()> {
            self.0.lock().unwrap().push(pid);
            Ok(())
        }
    }

    fn dispatcher(mode: ExecutionMode) -> ModeDispatcher<Pids, Terminated> {
        let command = Command::parse("echo hi").unwrap();
        ModeDispatcher::new(mode, command, Pids::default(), Terminated::default())
    }

    fn terminated(d: &ModeDispatcher<Pids, Terminated>) -> Vec<u32> {
        d.signaller().0.lock().unwrap().clone()
    }

    #[test]
    fn single_queues_until_the_outstanding_pid_exits() {
        let mut d = dispatcher(ExecutionMode::Single);
        let mut reg = ChildRegistry::new(4);

        assert_eq!(d.file_modified(Path::new("a"), &mut reg), DispatchOutcome::Launched { pid: 101 });
        assert_eq!(d.file_modified(Path::new("b"), &mut reg), DispatchOutcome::Queued { pending: 1 });
        assert_eq!(d.file_modified(Path::new("a"), &mut reg), DispatchOutcome::Queued { pending: 2 });

        // an unrelated exit does not release the line
        assert!(d.child_exited(999, &mut reg).is_empty());

        reg.remove(101);
        assert_eq!(d.child_exited(101, &mut reg), [DispatchOutcome::Launched { pid: 102 }]);
        assert_eq!(d.pending(), 1);
        assert_eq!(reg.pids(), [102]);
    }

    #[test]
    fn single_skips_failed_launches_in_the_queue() {
        let mut d = dispatcher(ExecutionMode::Single);
        let mut reg = ChildRegistry::new(4);

        d.file_modified(Path::new("a"), &mut reg);
        d.file_modified(Path::new("b"), &mut reg);
        d.file_modified(Path::new("c"), &mut reg);

        reg.remove(101);
        d.launcher.fail_next = true;
        let outcomes = d.child_exited(101, &mut reg);
        assert!(matches!(outcomes[0], DispatchOutcome::Failed { .. }));
        assert_eq!(outcomes[1], DispatchOutcome::Launched { pid: 102 });
        assert_eq!(d.outstanding(), Some(102));
        assert_eq!(d.pending(), 0);
    }

    #[test]
    fn concurrent_drops_events_beyond_capacity() {
        let mut d = dispatcher(ExecutionMode::Concurrent);
        let mut reg = ChildRegistry::new(2);

        assert!(matches!(d.file_modified(Path::new("a"), &mut reg), DispatchOutcome::Launched { .. }));
        assert!(matches!(d.file_modified(Path::new("a"), &mut reg), DispatchOutcome::Launched { .. }));
        assert_eq!(d.file_modified(Path::new("a"), &mut reg), DispatchOutcome::Rejected { capacity: 2 });
        assert_eq!(reg.count(), 2);

        reg.remove(101);
        assert_eq!(d.file_modified(Path::new("a"), &mut reg), DispatchOutcome::Launched { pid: 103 });
    }

    #[test]
    fn override_kills_previous_children_before_launching() {
        let mut d = dispatcher(ExecutionMode::Override);
        let mut reg = ChildRegistry::new(8);

        d.file_modified(Path::new("a"), &mut reg);
        assert!(terminated(&d).is_empty());

        d.file_modified(Path::new("a"), &mut reg);
        assert_eq!(terminated(&d), [101]);

        d.file_modified(Path::new("a"), &mut reg);
        // 101 is still tracked (no exit yet) but is not asked twice
        assert_eq!(terminated(&d), [101, 102]);
        assert_eq!(reg.pids(), [101, 102, 103]);
    }

    #[test]
    fn override_launches_even_when_ignored_requests_fill_the_registry() {
        let mut d = dispatcher(ExecutionMode::Override);
        let mut reg = ChildRegistry::new(1);

        // 101 ignores its termination request and never exits
        assert_eq!(d.file_modified(Path::new("a"), &mut reg), DispatchOutcome::Launched { pid: 101 });
        assert_eq!(d.file_modified(Path::new("a"), &mut reg), DispatchOutcome::Launched { pid: 102 });
        assert_eq!(d.file_modified(Path::new("b"), &mut reg), DispatchOutcome::Launched { pid: 103 });

        assert_eq!(terminated(&d), [101, 102]);
        assert_eq!(reg.pids(), [103]);

        // the late exit of an evicted child changes nothing
        assert!(!reg.remove(101));
        assert!(d.child_exited(101, &mut reg).is_empty());
        assert_eq!(reg.pids(), [103]);
    }

    #[test]
    fn teardown_asks_override_survivors_again() {
        let mut d = dispatcher(ExecutionMode::Override);
        let mut reg = ChildRegistry::new(4);
        d.file_modified(Path::new("a"), &mut reg);
        d.file_modified(Path::new("a"), &mut reg);
        assert_eq!(terminated(&d), [101]);

        assert_eq!(d.terminate_all(&mut reg), 2);
        assert_eq!(terminated(&d), [101, 101, 102]);
    }

    #[test]
    fn terminate_all_clears_the_queue() {
        let mut d = dispatcher(ExecutionMode::Single);
        let mut reg = ChildRegistry::new(4);
        d.file_modified(Path::new("a"), &mut reg);
        d.file_modified(Path::new("b"), &mut reg);

        assert_eq!(d.terminate_all(&mut reg), 1);
        assert_eq!(d.pending(), 0);
        assert_eq!(d.outstanding(), None);
        assert_eq!(terminated(&d), [101]);
    }
}
