// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FilewatchError {
    #[error("No files are being watched.")]
    NoFilesWatched,

    #[error("invalid mode: {0} (choose one of single(s), concurrent(c), override(o))")]
    InvalidMode(String),

    #[error("command is empty")]
    EmptyCommand,

    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot acquire file notification backend: {0}")]
    NotifyError(#[from] notify::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, FilewatchError>;
