// tests/cli_exit_codes.rs

use std::fs::OpenOptions;
use std::io::{Read, Write};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::{Duration, Instant};

use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tempfile::TempDir;

fn filewatch() -> Command {
    Command::new(env!("CARGO_BIN_EXE_filewatch"))
}

fn wait_with_deadline(child: &mut Child, limit: Duration) -> std::process::ExitStatus {
    let deadline = Instant::now() + limit;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() > deadline {
            let _ = child.kill();
            panic!("filewatch did not exit within {limit:?}");
        }
        sleep(Duration::from_millis(20));
    }
}

#[test]
fn exits_with_failure_when_nothing_can_be_watched() {
    let dir = TempDir::new().unwrap();
    let output = filewatch()
        .arg(dir.path())
        .arg(dir.path().join("missing.txt"))
        .arg("echo hi")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("No files are being watched"), "stderr: {stderr}");
}

#[test]
fn rejects_invalid_mode() {
    let output = filewatch()
        .args(["-m", "sometimes", "Cargo.toml", "echo hi"])
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn requires_files_and_a_command() {
    let output = filewatch().arg("echo hi").output().unwrap();
    assert!(!output.status.success());
}

#[test]
fn sigterm_stops_supervisor_and_its_child() {
    let dir = TempDir::new().unwrap();
    let watched = dir.path().join("a.txt");
    std::fs::write(&watched, "start\n").unwrap();

    let mut supervisor = filewatch()
        .args(["-m", "concurrent"])
        .arg(&watched)
        .arg("sleep 30")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();

    // give the supervisor time to install its watches
    sleep(Duration::from_millis(500));
    let mut file = OpenOptions::new().append(true).open(&watched).unwrap();
    writeln!(file, "changed").unwrap();
    file.sync_all().unwrap();
    sleep(Duration::from_millis(500));

    let started = Instant::now();
    kill(Pid::from_raw(supervisor.id() as i32), Signal::SIGTERM).unwrap();
    let status = wait_with_deadline(&mut supervisor, Duration::from_secs(5));
    assert!(status.success(), "status: {status:?}");

    // the `sleep` child shares the stdout pipe; EOF means it is gone too
    let mut stdout = String::new();
    supervisor
        .stdout
        .take()
        .unwrap()
        .read_to_string(&mut stdout)
        .unwrap();
    assert!(started.elapsed() < Duration::from_secs(10));
    assert!(stdout.contains("has been modified."), "stdout: {stdout}");
}

#[test]
fn closed_stdout_shuts_down_cleanly() {
    let dir = TempDir::new().unwrap();
    let watched = dir.path().join("a.txt");
    std::fs::write(&watched, "start\n").unwrap();

    let mut supervisor = filewatch()
        .args(["-m", "concurrent"])
        .arg(&watched)
        .arg("true")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .spawn()
        .unwrap();
    drop(supervisor.stdout.take());

    sleep(Duration::from_millis(500));
    let mut file = OpenOptions::new().append(true).open(&watched).unwrap();
    for _ in 0..3 {
        writeln!(file, "changed").unwrap();
        file.sync_all().unwrap();
        sleep(Duration::from_millis(100));
    }

    let status = wait_with_deadline(&mut supervisor, Duration::from_secs(5));
    assert_eq!(status.code(), Some(0), "status: {status:?}");
}
