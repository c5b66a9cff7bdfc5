// src/exec/launcher.rs

//! Starting one command instance.

use std::path::Path;

use anyhow::anyhow;
use tokio::process::Command as ProcessCommand;
use tracing::debug;

use crate::errors::{FilewatchError, Result};
use crate::signals::ExitNotifier;
use crate::types::Command;

/// Trait abstracting how a command instance is started.
///
/// Production code uses [`ProcessLauncher`]; tests can provide an
/// implementation that hands out fake pids.
pub trait CommandLauncher: Send {
    /// Start `command` because `trigger` was modified and return its pid.
    ///
    /// The exit must later be reported as a child-exit notification.
    fn launch(&mut self, command: &Command, trigger: &Path) -> Result<u32>;
}

/// Spawns real processes with `tokio::process` and hands each child to a
/// reaper task.
///
/// Children inherit stdin/stdout/stderr and are not killed when their
/// handle is dropped; shutdown asks them to terminate explicitly.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    exits: ExitNotifier,
}

impl ProcessLauncher {
    pub fn new(exits: ExitNotifier) -> Self {
        Self { exits }
    }
}

impl CommandLauncher for ProcessLauncher {
    fn launch(&mut self, command: &Command, trigger: &Path) -> Result<u32> {
        let child = ProcessCommand::new(command.program())
            .args(command.args_for(trigger))
            .kill_on_drop(false)
            .spawn()
            .map_err(|source| FilewatchError::Spawn {
                program: command.program().to_string(),
                source,
            })?;

        let pid = child
            .id()
            .ok_or_else(|| anyhow!("{} exited before its pid was read", command.program()))?;
        debug!(pid, cmd = %command, trigger = %trigger.display(), "spawned child");

        self.exits.watch(pid, child);
        Ok(pid)
    }
}
