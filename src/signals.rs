// src/signals.rs

//! Signal bridge.
//!
//! Asynchronous OS notifications are turned into [`SupervisorSignal`]s on a
//! single channel that the event loop waits on next to the file-change
//! source. Nothing here touches supervisor state: termination signals are
//! only recorded, and child exits are only reported.
//!
//! - Termination requests (`SIGHUP`, `SIGINT`, `SIGPIPE`, `SIGALRM`,
//!   `SIGTERM`, `SIGUSR1`, `SIGUSR2`) come from `tokio::signal::unix`
//!   streams, created synchronously in [`SignalBridge::listen_for_termination`]
//!   so no occurrence is lost before the loop starts waiting.
//! - Child exits come from one reaper task per child, started by
//!   [`ExitNotifier::watch`] right after the spawn.

use std::fmt;

use anyhow::Context;
use tokio::process::Child;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::Result;

/// The termination requests the supervisor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSignal {
    Hangup,
    Interrupt,
    Pipe,
    Alarm,
    Terminate,
    User1,
    User2,
}

impl TerminationSignal {
    pub const ALL: [TerminationSignal; 7] = [
        TerminationSignal::Hangup,
        TerminationSignal::Interrupt,
        TerminationSignal::Pipe,
        TerminationSignal::Alarm,
        TerminationSignal::Terminate,
        TerminationSignal::User1,
        TerminationSignal::User2,
    ];

    fn kind(self) -> SignalKind {
        match self {
            TerminationSignal::Hangup => SignalKind::hangup(),
            TerminationSignal::Interrupt => SignalKind::interrupt(),
            TerminationSignal::Pipe => SignalKind::pipe(),
            TerminationSignal::Alarm => SignalKind::alarm(),
            TerminationSignal::Terminate => SignalKind::terminate(),
            TerminationSignal::User1 => SignalKind::user_defined1(),
            TerminationSignal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for TerminationSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationSignal::Hangup => "SIGHUP",
            TerminationSignal::Interrupt => "SIGINT",
            TerminationSignal::Pipe => "SIGPIPE",
            TerminationSignal::Alarm => "SIGALRM",
            TerminationSignal::Terminate => "SIGTERM",
            TerminationSignal::User1 => "SIGUSR1",
            TerminationSignal::User2 => "SIGUSR2",
        };
        f.write_str(name)
    }
}

/// What the bridge delivers to the event loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorSignal {
    /// The supervisor was asked to shut down.
    Terminate(TerminationSignal),
    /// A child process exited; `code` is `None` when it was killed by a
    /// signal.
    ChildExited { pid: u32, code: Option<i32> },
}

/// Pollable end of the bridge, owned by the event loop.
#[derive(Debug)]
pub struct SignalBridge {
    tx: mpsc::UnboundedSender<SupervisorSignal>,
    rx: mpsc::UnboundedReceiver<SupervisorSignal>,
}

impl SignalBridge {
    /// A bridge with no OS handlers attached yet.
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    /// Install handlers for every [`TerminationSignal`].
    ///
    /// Must run inside a Tokio runtime. Fails if any handler cannot be
    /// registered.
    pub fn listen_for_termination(&self) -> Result<()> {
        let mut streams: Vec<(TerminationSignal, Signal)> = Vec::new();
        for sig in TerminationSignal::ALL {
            let stream = signal(sig.kind())
                .with_context(|| format!("installing {sig} handler"))?;
            streams.push((sig, stream));
        }

        for (sig, mut stream) in streams {
            let tx = self.tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    debug!(signal = %sig, "termination signal received");
                    if tx.send(SupervisorSignal::Terminate(sig)).is_err() {
                        break;
                    }
                }
            });
        }
        Ok(())
    }

    /// Handle given to the launcher so reaper tasks can report exits.
    pub fn exit_notifier(&self) -> ExitNotifier {
        ExitNotifier {
            tx: self.tx.clone(),
        }
    }

    /// Raw sender, for tests and for injecting synthetic signals.
    pub fn sender(&self) -> mpsc::UnboundedSender<SupervisorSignal> {
        self.tx.clone()
    }

    /// Wait for the next signal. Never returns `None` while the bridge is
    /// alive, since it keeps a sender itself.
    pub async fn recv(&mut self) -> Option<SupervisorSignal> {
        self.rx.recv().await
    }
}

impl Default for SignalBridge {
    fn default() -> Self {
        Self::new()
    }
}

/// Reports child exits back into the bridge.
#[derive(Debug, Clone)]
pub struct ExitNotifier {
    tx: mpsc::UnboundedSender<SupervisorSignal>,
}

impl ExitNotifier {
    /// Reap `child` in the background and report its exit.
    pub fn watch(&self, pid: u32, mut child: Child) {
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let code = match child.wait().await {
                Ok(status) => status.code(),
                Err(err) => {
                    warn!(pid, error = %err, "failed to wait for child");
                    None
                }
            };
            let _ = tx.send(SupervisorSignal::ChildExited { pid, code });
        });
    }
}
