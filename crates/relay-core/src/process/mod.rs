//! OS process spawning and supervision for shell steps.
//!
//! A [`ProcessSpawner`] starts a program with an explicit argument vector
//! (never through a shell) and returns a [`SpawnedProcess`]: a handle that can
//! kill the child plus a channel of [`ProcessEvent`]s. Output chunks arrive in
//! order and the stream ends with exactly one `Exited` or `Error` event.
//!
//! The [`ProcessTable`] tracks which process belongs to which running step.

use std::{io, path::PathBuf};

use tokio::sync::mpsc;

pub mod spawner;
pub mod table;

pub use spawner::TokioSpawner;
pub use table::{ProcessKey, ProcessTable, RunToken};

/// What to start: a program, its arguments, and the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl SpawnRequest {
    /// Build a request from an argument vector whose first element is the
    /// program. Returns `None` for an empty vector.
    pub fn from_parts(parts: &[String], cwd: impl Into<PathBuf>) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
            cwd: cwd.into(),
        })
    }
}

/// Something observed about a running child process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessEvent {
    Stdout(Vec<u8>),
    Stderr(Vec<u8>),
    /// The process exited; `-1` when it was terminated by a signal.
    Exited(i32),
    /// The process could not be waited on.
    Error(String),
}

/// Control over a spawned child.
pub trait ProcessHandle: Send {
    /// Forcibly terminate the child. Killing an exited child is a no-op.
    fn kill(&mut self);
}

/// A started child: its control handle and its event stream.
pub struct SpawnedProcess {
    pub handle: Box<dyn ProcessHandle>,
    pub events: mpsc::UnboundedReceiver<ProcessEvent>,
}

/// Starts child processes.
pub trait ProcessSpawner: Send + Sync {
    fn spawn(&self, request: &SpawnRequest) -> io::Result<SpawnedProcess>;
}
