// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::errors::Result;
use crate::exec::DEFAULT_MAX_PROCS;
use crate::types::{Command, ExecutionMode};

/// Command-line arguments for `filewatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "filewatch",
    version,
    about = "Run a command every time one of the watched files is modified.",
    long_about = None
)]
pub struct CliArgs {
    /// Execution mode: single (s), concurrent (c) or override (o).
    #[arg(short, long, value_name = "MODE", default_value = "single", value_parser = parse_mode)]
    pub mode: ExecutionMode,

    /// Maximum number of children tracked at once.
    #[arg(
        short = 'j',
        long,
        value_name = "N",
        default_value_t = DEFAULT_MAX_PROCS,
        value_parser = parse_max_procs
    )]
    pub max_procs: usize,

    /// Replace `{}` tokens in the command with the modified file's path.
    #[arg(long)]
    pub substitute_path: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `FILEWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Files to watch, followed by the command to run.
    #[arg(value_name = "FILE... COMMAND", required = true, num_args = 2..)]
    pub targets: Vec<String>,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl CliArgs {
    /// Paths to watch: every positional except the last.
    pub fn files(&self) -> Vec<PathBuf> {
        let n = self.targets.len().saturating_sub(1);
        self.targets[..n].iter().map(PathBuf::from).collect()
    }

    /// The command built from the last positional.
    pub fn command(&self) -> Result<Command> {
        let raw = self.targets.last().map(String::as_str).unwrap_or_default();
        Ok(Command::parse(raw)?.with_path_substitution(self.substitute_path))
    }
}

fn parse_mode(s: &str) -> std::result::Result<ExecutionMode, String> {
    s.parse().map_err(|e: crate::errors::FilewatchError| e.to_string())
}

fn parse_max_procs(s: &str) -> std::result::Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
