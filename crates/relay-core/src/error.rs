//! Error types for the execution engine.

use std::path::PathBuf;

use thiserror::Error;

/// Error type for engine operations that can fail outright.
///
/// Unknown plan or step ids are not errors at the public surface: operations
/// report them as `false`/`None`. The not-found variants are for callers
/// such as the CLI that want to turn those into errors.
#[derive(Error, Debug)]
pub enum EngineError {
    /// Plan not found for the given ID
    #[error("Plan with ID {id} not found")]
    PlanNotFound { id: String },
    /// Step not found within a plan
    #[error("Step with ID {step_id} not found in plan {plan_id}")]
    StepNotFound { plan_id: String, step_id: String },
    /// File system operation errors
    #[error("File system error at path '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        source: std::io::Error,
    },
    /// XDG directory specification errors
    #[error("XDG directory error: {0}")]
    XdgDirectory(String),
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
    /// Serialization/deserialization errors
    #[error("Serialization error: {source}")]
    Serialization {
        #[from]
        source: serde_json::Error,
    },
    /// Configuration errors
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    /// Create a new invalid input error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> EngineError {
        EngineError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl EngineError {
    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    /// Wraps an I/O error with the path it occurred at.
    pub fn file_system(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }
}

/// Extension trait for attaching a path to I/O results.
pub trait IoResultExt<T> {
    /// Map an I/O error into [`EngineError::FileSystem`] for `path`.
    fn at_path(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn at_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| EngineError::file_system(path, e))
    }
}

/// Why a step (and with it, its plan) failed.
///
/// The `Display` output is the exact text recorded in the step's and the
/// plan's `error` field.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StepFailure {
    /// The command string was rejected before spawning.
    #[error("Command validation failed: {0}")]
    CommandRejected(String),
    /// The working directory lies outside the allowed roots.
    #[error("Path validation failed: {0}")]
    PathRejected(String),
    /// Spawn failure, non-zero exit, or runtime process error.
    #[error("{0}")]
    Process(String),
    /// No eligible step could be found by the forward scan.
    #[error("Circular dependency or unmet dependencies")]
    Scheduling,
    /// A running step interrupted by `cancel`.
    #[error("Cancelled")]
    Cancelled,
}

impl StepFailure {
    /// Failure for a process that exited with a non-zero code.
    ///
    /// Prefers the captured stderr; falls back to the exit code when the
    /// process wrote nothing to stderr.
    pub fn exit(code: i32, stderr: &str) -> Self {
        if stderr.trim().is_empty() {
            Self::Process(format!("Exit code: {code}"))
        } else {
            Self::Process(stderr.to_string())
        }
    }
}

/// Plan-level error recorded by `cancel`.
pub const CANCELLED_BY_USER: &str = "Cancelled by user";

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_failure_messages() {
        assert_eq!(
            StepFailure::Scheduling.to_string(),
            "Circular dependency or unmet dependencies"
        );
        assert_eq!(StepFailure::Cancelled.to_string(), "Cancelled");
        assert_eq!(
            StepFailure::CommandRejected("rm is not allowed".into()).to_string(),
            "Command validation failed: rm is not allowed"
        );
    }

    #[test]
    fn test_exit_failure_prefers_stderr() {
        assert_eq!(
            StepFailure::exit(2, "boom\n").to_string(),
            "boom\n"
        );
        assert_eq!(StepFailure::exit(3, "  ").to_string(), "Exit code: 3");
    }

    #[test]
    fn test_invalid_input_builder() {
        let err = EngineError::invalid_input("title").with_reason("must not be empty");
        assert_eq!(
            err.to_string(),
            "Invalid input for field 'title': must not be empty"
        );
    }
}
