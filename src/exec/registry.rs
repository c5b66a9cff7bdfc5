// src/exec/registry.rs

//! Bounded bookkeeping of the children that are currently alive.

use tracing::{debug, warn};

use crate::exec::signaller::ProcessSignaller;

/// Default capacity of a [`ChildRegistry`].
pub const DEFAULT_MAX_PROCS: usize = 32;

/// One occupied registry slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackedChild {
    pub pid: u32,
    /// Set once this child has been asked to terminate.
    pub termination_sent: bool,
    /// Admission order; lower is older.
    pub admitted: u64,
}

/// Fixed-capacity slot table of live child pids.
///
/// Pure bookkeeping: the only side effect is through the
/// [`ProcessSignaller`] handed to [`ChildRegistry::kill_all`]. Membership is
/// the "alive" flag; a pid leaves the table when its exit is reported or
/// when the supervisor tears down.
#[derive(Debug, Clone)]
pub struct ChildRegistry {
    slots: Vec<Option<TrackedChild>>,
    len: usize,
    admissions: u64,
}

impl ChildRegistry {
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity.max(1)],
            len: 0,
            admissions: 0,
        }
    }

    /// Insert `pid` into the first free slot.
    ///
    /// Returns `false` when the table is full or `pid` is already tracked.
    pub fn add(&mut self, pid: u32) -> bool {
        if self.contains(pid) {
            debug!(pid, "pid already tracked");
            return false;
        }
        match self.slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(TrackedChild {
                    pid,
                    termination_sent: false,
                    admitted: self.admissions,
                });
                self.admissions += 1;
                self.len += 1;
                true
            }
            None => false,
        }
    }

    /// Forget `pid`. Absent pids are not an error; returns whether it was
    /// tracked.
    pub fn remove(&mut self, pid: u32) -> bool {
        for slot in &mut self.slots {
            if slot.is_some_and(|child| child.pid == pid) {
                *slot = None;
                self.len -= 1;
                return true;
            }
        }
        false
    }

    pub fn contains(&self, pid: u32) -> bool {
        self.children().any(|child| child.pid == pid)
    }

    pub fn count(&self) -> usize {
        self.len
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_full(&self) -> bool {
        self.len >= self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn children(&self) -> impl Iterator<Item = &TrackedChild> {
        self.slots.iter().flatten()
    }

    /// Tracked pids in slot order.
    pub fn pids(&self) -> Vec<u32> {
        self.children().map(|child| child.pid).collect()
    }

    /// Ask every tracked child to terminate, without waiting for it.
    ///
    /// Children asked before are asked again. Returns the number of
    /// requests sent.
    pub fn kill_all(&mut self, signaller: &dyn ProcessSignaller) -> usize {
        self.request_termination(signaller, true)
    }

    /// Like [`kill_all`](Self::kill_all), but skips children that were
    /// already asked, so repeated sweeps reach each child once.
    pub fn kill_unsignalled(&mut self, signaller: &dyn ProcessSignaller) -> usize {
        self.request_termination(signaller, false)
    }

    /// Stop tracking the oldest child that has already been asked to
    /// terminate, making room for a new one. Its exit, if reported later,
    /// is that of an untracked pid.
    pub fn evict_signalled(&mut self) -> Option<u32> {
        let slot = self
            .slots
            .iter_mut()
            .filter(|slot| slot.is_some_and(|child| child.termination_sent))
            .min_by_key(|slot| slot.map(|child| child.admitted))?;
        let child = slot.take()?;
        self.len -= 1;
        debug!(pid = child.pid, "evicted signalled child");
        Some(child.pid)
    }

    fn request_termination(&mut self, signaller: &dyn ProcessSignaller, resend: bool) -> usize {
        let mut sent = 0;
        for child in self.slots.iter_mut().flatten() {
            if child.termination_sent && !resend {
                continue;
            }
            child.termination_sent = true;
            sent += 1;
            if let Err(err) = signaller.terminate(child.pid) {
                warn!(pid = child.pid, error = %err, "failed to request termination");
            }
        }
        sent
    }

    /// Drop every entry; used at teardown after `kill_all`.
    pub fn clear(&mut self) -> usize {
        let removed = self.len;
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.len = 0;
        removed
    }
}

impl Default for ChildRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PROCS)
    }
}
