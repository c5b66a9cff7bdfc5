// src/exec/signaller.rs

use anyhow::anyhow;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tracing::debug;

use crate::errors::Result;

/// Delivers termination requests to child processes.
pub trait ProcessSignaller: Send {
    /// Ask `pid` to exit. The target may ignore the request.
    fn terminate(&self, pid: u32) -> Result<()>;
}

/// Sends `SIGTERM` with `kill(2)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SigtermSignaller;

impl ProcessSignaller for SigtermSignaller {
    fn terminate(&self, pid: u32) -> Result<()> {
        // pid 0 or a negative value would address a whole process group.
        let raw = i32::try_from(pid)
            .ok()
            .filter(|raw| *raw > 0)
            .ok_or_else(|| anyhow!("refusing to signal pid {pid}"))?;

        match kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) => {
                debug!(pid, "sent SIGTERM");
                Ok(())
            }
            Err(Errno::ESRCH) => {
                debug!(pid, "process already exited");
                Ok(())
            }
            Err(errno) => {
                Err(anyhow::Error::new(errno).context(format!("sending SIGTERM to {pid}")).into())
            }
        }
    }
}
