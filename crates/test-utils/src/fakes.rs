#![allow(dead_code)]

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use filewatch::errors::{FilewatchError, Result};
use filewatch::exec::{CommandLauncher, ProcessSignaller};
use filewatch::fs::mock::MockFileSystem;
use filewatch::types::Command;
use filewatch::watch::{ChangeSource, WatchBackend, WatchId, WatchTable};

/// A stdout whose reader has gone away: every write fails with `EPIPE`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClosedStdout;

impl std::io::Write for ClosedStdout {
    fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe))
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// One recorded launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Launch {
    pub pid: u32,
    pub trigger: PathBuf,
    pub program: String,
}

/// A launcher that hands out fake pids (1000, 1001, ...) and records every
/// call. Programs listed in `failing` return a spawn error instead.
#[derive(Clone, Default)]
pub struct FakeLauncher {
    pub launches: Arc<Mutex<Vec<Launch>>>,
    failing: Arc<Mutex<Vec<String>>>,
}

impl FakeLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_program(&self, program: &str) {
        self.failing.lock().unwrap().push(program.to_string());
    }

    pub fn launches(&self) -> Vec<Launch> {
        self.launches.lock().unwrap().clone()
    }

    pub fn pids(&self) -> Vec<u32> {
        self.launches().into_iter().map(|l| l.pid).collect()
    }
}

impl CommandLauncher for FakeLauncher {
    fn launch(&mut self, command: &Command, trigger: &Path) -> Result<u32> {
        if self.failing.lock().unwrap().iter().any(|p| p == command.program()) {
            return Err(FilewatchError::Spawn {
                program: command.program().to_string(),
                source: std::io::Error::from(std::io::ErrorKind::NotFound),
            });
        }
        let mut launches = self.launches.lock().unwrap();
        let pid = 1000 + launches.len() as u32;
        launches.push(Launch {
            pid,
            trigger: trigger.to_path_buf(),
            program: command.program().to_string(),
        });
        Ok(pid)
    }
}

/// Records every termination request.
#[derive(Clone, Default)]
pub struct RecordingSignaller {
    pub terminated: Arc<Mutex<Vec<u32>>>,
}

impl RecordingSignaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn terminated(&self) -> Vec<u32> {
        self.terminated.lock().unwrap().clone()
    }
}

impl ProcessSignaller for RecordingSignaller {
    fn terminate(&self, pid: u32) -> Result<()> {
        self.terminated.lock().unwrap().push(pid);
        Ok(())
    }
}

/// Issues ids 1, 2, ... in registration order.
#[derive(Default)]
pub struct SequentialBackend {
    next: u64,
}

impl WatchBackend for SequentialBackend {
    fn add_watch(&mut self, _path: &Path) -> anyhow::Result<WatchId> {
        self.next += 1;
        Ok(WatchId::new(self.next))
    }
}

/// Build a table for `paths`, all treated as regular files.
pub fn watch_table(paths: &[&str]) -> WatchTable {
    let fs = MockFileSystem::new();
    for p in paths {
        fs.add_file(p);
    }
    let paths: Vec<PathBuf> = paths.iter().map(PathBuf::from).collect();
    WatchTable::register(&paths, &fs, &mut SequentialBackend::default())
        .expect("at least one path")
}

/// A change source fed by the test through an mpsc channel.
pub struct ScriptedChanges {
    table: WatchTable,
    rx: mpsc::UnboundedReceiver<Vec<WatchId>>,
}

impl ScriptedChanges {
    pub fn new(paths: &[&str]) -> (Self, mpsc::UnboundedSender<Vec<WatchId>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                table: watch_table(paths),
                rx,
            },
            tx,
        )
    }
}

impl ChangeSource for ScriptedChanges {
    fn next_changes(&mut self) -> Pin<Box<dyn Future<Output = Option<Vec<WatchId>>> + Send + '_>> {
        Box::pin(self.rx.recv())
    }

    fn resolve(&self, watch_id: WatchId) -> Option<&Path> {
        self.table.resolve(watch_id)
    }
}
