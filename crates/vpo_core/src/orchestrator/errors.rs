//! Error types for phase execution.
//!
//! Errors chain through layers:
//! File → Phase → Operation → Collaborator

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::language::TranscriptionError;
use crate::policy::{OperationKind, PolicyError};

use super::types::PhaseExecutionReport;

/// An external tool exited unsuccessfully.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{tool} failed with exit code {exit_code}: {stderr}")]
pub struct ToolExecutionError {
    pub tool: String,
    pub exit_code: i32,
    pub stderr: String,
}

impl ToolExecutionError {
    pub fn new(tool: impl Into<String>, exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            exit_code,
            stderr: stderr.into(),
        }
    }
}

/// The introspector could not describe a file.
#[derive(Error, Debug)]
pub enum IntrospectionError {
    #[error("File not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to introspect {}: {message}", .path.display())]
    Failed { path: PathBuf, message: String },
}

impl IntrospectionError {
    pub fn failed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Failed {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Creating, restoring or discarding a restore point failed.
#[derive(Error, Debug)]
pub enum BackupError {
    #[error("I/O error while trying to {operation} {}: {source}", .path.display())]
    Io {
        operation: String,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Backup missing for {}", .0.display())]
    Missing(PathBuf),
}

impl BackupError {
    pub fn io(operation: impl Into<String>, path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            operation: operation.into(),
            path: path.into(),
            source,
        }
    }
}

/// Anything a single operation (or the phase bookkeeping around it) can raise.
#[derive(Error, Debug)]
pub enum OperationError {
    #[error(transparent)]
    Policy(#[from] PolicyError),

    #[error(transparent)]
    Tool(#[from] ToolExecutionError),

    #[error(transparent)]
    Introspection(#[from] IntrospectionError),

    #[error(transparent)]
    Transcription(#[from] TranscriptionError),

    #[error("Could not create restore point: {0}")]
    Backup(#[from] BackupError),

    #[error("Cancelled before {operation}")]
    Cancelled { operation: OperationKind },
}

impl OperationError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, OperationError::Cancelled { .. })
    }
}

/// Result type for operations.
pub type OperationResult<T> = Result<T, OperationError>;

/// Errors returned by `evaluate` instead of a report.
#[derive(Error, Debug)]
pub enum ExecutionError {
    /// A requested phase name is not in the policy. Nothing was touched.
    #[error(
        "Phase(s) not found: {}. Available phases: {}",
        .requested.join(", "),
        .available.join(", ")
    )]
    PhaseNotFound {
        requested: Vec<String>,
        available: Vec<String>,
    },

    /// Restoring a restore point failed. The file may be inconsistent.
    #[error("Rollback of phase '{phase}' failed, file may be left inconsistent: {source}")]
    RollbackFailed {
        phase: String,
        #[source]
        source: BackupError,
        /// The report up to the failure.
        report: Box<PhaseExecutionReport>,
    },

    #[error("Failed to start batch workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

impl ExecutionError {
    pub fn phase_not_found(requested: Vec<String>, available: Vec<String>) -> Self {
        Self::PhaseNotFound {
            requested,
            available,
        }
    }

    /// Whether the file may have been left in an unknown state.
    pub fn is_unrecoverable(&self) -> bool {
        matches!(self, ExecutionError::RollbackFailed { .. })
    }
}

/// Result type for `evaluate`.
pub type ExecutionResult<T> = Result<T, ExecutionError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn tool_error_display() {
        let err = ToolExecutionError::new("mkvmerge", 2, "bad track id");
        assert_eq!(err.to_string(), "mkvmerge failed with exit code 2: bad track id");
    }

    #[test]
    fn operation_error_wraps_policy_error() {
        let err: OperationError =
            PolicyError::conditional_fail("no-eng", Path::new("/m/a.mkv"), "no english").into();
        assert!(err.to_string().contains("no english"));
        assert!(!err.is_cancelled());
    }

    #[test]
    fn phase_not_found_lists_names() {
        let err = ExecutionError::phase_not_found(
            vec!["missing".into()],
            vec!["normalize".into(), "transcode".into()],
        );
        let msg = err.to_string();
        assert!(msg.contains("missing"));
        assert!(msg.contains("normalize, transcode"));
        assert!(!err.is_unrecoverable());
    }
}
