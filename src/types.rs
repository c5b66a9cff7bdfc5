// src/types.rs

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::errors::{FilewatchError, Result};

/// How command invocations may overlap.
///
/// - `Single`: one invocation at a time; modifications that arrive while it
///   runs are queued and launched one after the other (default).
/// - `Concurrent`: up to the registry capacity in parallel; excess
///   modifications are dropped.
/// - `Override`: every tracked child is asked to terminate before the new
///   invocation starts, so only the latest one survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    #[default]
    Single,
    Concurrent,
    Override,
}

impl FromStr for ExecutionMode {
    type Err = FilewatchError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "single" | "s" | "queue" | "q" => Ok(ExecutionMode::Single),
            "concurrent" | "c" => Ok(ExecutionMode::Concurrent),
            "override" | "o" => Ok(ExecutionMode::Override),
            _ => Err(FilewatchError::InvalidMode(s.to_string())),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExecutionMode::Single => "single",
            ExecutionMode::Concurrent => "concurrent",
            ExecutionMode::Override => "override",
        };
        f.write_str(name)
    }
}

/// Placeholder replaced by the triggering path when substitution is enabled.
pub const PATH_PLACEHOLDER: &str = "{}";

/// Argument vector of the command to run on every modification.
///
/// The first element is the program; it is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    argv: Vec<String>,
    substitute_path: bool,
}

impl Command {
    /// Tokenise a command string on spaces, tabs and newlines.
    pub fn parse(raw: &str) -> Result<Self> {
        let argv: Vec<String> = raw
            .split([' ', '\t', '\n'])
            .filter(|tok| !tok.is_empty())
            .map(str::to_string)
            .collect();
        Self::from_argv(argv)
    }

    pub fn from_argv(argv: Vec<String>) -> Result<Self> {
        if argv.is_empty() {
            return Err(FilewatchError::EmptyCommand);
        }
        Ok(Self {
            argv,
            substitute_path: false,
        })
    }

    /// Replace `{}` tokens with the triggering path when building argv.
    pub fn with_path_substitution(mut self, enabled: bool) -> Self {
        self.substitute_path = enabled;
        self
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    /// Arguments (without the program) for an invocation triggered by `path`.
    pub fn args_for(&self, path: &Path) -> Vec<String> {
        if !self.substitute_path {
            return self.args().to_vec();
        }
        let path = path.to_string_lossy();
        self.args()
            .iter()
            .map(|arg| {
                if arg == PATH_PLACEHOLDER {
                    path.to_string()
                } else {
                    arg.clone()
                }
            })
            .collect()
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.argv.join(" "))
    }
}
