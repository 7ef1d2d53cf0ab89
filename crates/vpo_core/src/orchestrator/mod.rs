//! Phase execution for files.
//!
//! A policy is a list of named phases. For each file the
//! [`PhaseExecutor`] runs the selected phases in order; inside a phase the
//! operations run in canonical order. Every phase is atomic: its restore
//! point is taken before the first operation and restored if any of them
//! fails.
//!
//! # Architecture
//!
//! ```text
//! BatchRunner (rayon pool, one file per task)
//!     └── PhaseExecutor::evaluate
//!             ├── skip checks (empty phase, depends_on, skip_when)
//!             ├── restore point (Arc<ExecutionState> + file backup)
//!             ├── operations ──► ToolRunner ──► projection
//!             ├── re-introspection
//!             └── commit or rollback
//! ```
//!
//! # Example
//!
//! ```ignore
//! use vpo_core::orchestrator::{Collaborators, FileBackupStore, PhaseExecutor};
//!
//! let backups = Arc::new(FileBackupStore::default());
//! let collaborators = Collaborators::new(introspector, tools, backups);
//! let executor = PhaseExecutor::new(collaborators);
//! let report = executor.evaluate(path, file_info, &policy, None)?;
//! println!("{}", report.to_json()?);
//! ```

mod batch;
mod cancel;
mod collaborators;
mod errors;
mod executor;
mod operations;
mod projection;
mod skip;
mod snapshot;
mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchFileResult, BatchReport, BatchRunner};
pub use cancel::CancelHandle;
pub use collaborators::{
    BackupStore, Collaborators, ExtractRequest, FileBackupStore, Introspector, RemuxRequest,
    RestorePoint, ToolRunner, TranscodeRequest,
};
pub use errors::{
    BackupError, ExecutionError, ExecutionResult, IntrospectionError, OperationError,
    OperationResult, ToolExecutionError,
};
pub use executor::PhaseExecutor;
pub use projection::{project, TrackEdit};
pub use skip::{resolution_label, skip_reason, unmet_dependency};
pub use types::{
    ExecutionState, FileOutcome, PhaseExecutionReport, PhaseFailure, PhaseReport, PhaseStatus,
};
