//! Batch runner: evaluates one policy against many files in parallel.
//!
//! Files never share execution state. Each worker introspects its file,
//! evaluates it with its own logger and reports back; the batch stops
//! handing out new files once a file fails under `on_error = fail`, a
//! rollback fails or the run is cancelled.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::Settings;
use crate::logging::JobLogger;
use crate::policy::{OnError, Policy};

use super::errors::{ExecutionError, ExecutionResult};
use super::executor::{display_name, select_phases, PhaseExecutor};
use super::types::{FileOutcome, PhaseExecutionReport};

/// Result for one file of a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchFileResult {
    pub path: PathBuf,
    pub outcome: FileOutcome,
    /// Missing when the file could not be introspected.
    pub report: Option<PhaseExecutionReport>,
    pub error: Option<String>,
    /// A rollback failed; the file needs manual attention.
    pub unrecoverable: bool,
}

impl BatchFileResult {
    fn failed(path: &Path, error: impl Into<String>) -> Self {
        Self {
            path: path.to_path_buf(),
            outcome: FileOutcome::Failure,
            report: None,
            error: Some(error.into()),
            unrecoverable: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    /// Results of processed files, in input order.
    pub results: Vec<BatchFileResult>,
    /// Files left untouched because the batch stopped early.
    pub not_started: Vec<PathBuf>,
}

impl BatchReport {
    fn count(&self, outcome: FileOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn succeeded(&self) -> usize {
        self.count(FileOutcome::Success)
    }

    pub fn partially_failed(&self) -> usize {
        self.count(FileOutcome::PartialFailure)
    }

    pub fn failed(&self) -> usize {
        self.count(FileOutcome::Failure)
    }

    pub fn is_success(&self) -> bool {
        self.not_started.is_empty()
            && self
                .results
                .iter()
                .all(|r| r.outcome == FileOutcome::Success)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

pub struct BatchRunner {
    executor: Arc<PhaseExecutor>,
    /// Worker threads; 0 lets rayon pick.
    max_workers: usize,
    logs_folder: Option<PathBuf>,
    requested: Option<Vec<String>>,
}

impl BatchRunner {
    pub fn new(executor: Arc<PhaseExecutor>) -> Self {
        Self {
            executor,
            max_workers: 0,
            logs_folder: None,
            requested: None,
        }
    }

    /// Runner using the execution and path sections of `settings`.
    pub fn from_settings(executor: Arc<PhaseExecutor>, settings: &Settings) -> Self {
        let runner = Self::new(executor).with_max_workers(settings.execution.max_workers);
        if settings.logging.file_logs {
            runner.with_logs_folder(&settings.paths.logs_folder)
        } else {
            runner
        }
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    /// Write one log file per input file into `folder`.
    pub fn with_logs_folder(mut self, folder: impl Into<PathBuf>) -> Self {
        self.logs_folder = Some(folder.into());
        self
    }

    /// Only run the named phases.
    pub fn with_phases(mut self, phases: Vec<String>) -> Self {
        self.requested = Some(phases);
        self
    }

    pub fn executor(&self) -> &PhaseExecutor {
        &self.executor
    }

    /// Evaluate `policy` against every file in `files`.
    ///
    /// Unknown phase names fail the whole batch before any file is touched.
    pub fn run(&self, policy: &Policy, files: &[PathBuf]) -> ExecutionResult<BatchReport> {
        select_phases(policy, self.requested.as_deref())?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.max_workers)
            .thread_name(|i| format!("vpo-worker-{}", i))
            .build()?;

        info!(
            files = files.len(),
            workers = pool.current_num_threads(),
            "Starting batch"
        );

        let stop = AtomicBool::new(false);
        let cancel = self.executor.cancel_handle();
        let stop_on_failure = policy.config().on_error == OnError::Fail;
        let log_names = log_names(files);

        let processed: Vec<Option<BatchFileResult>> = pool.install(|| {
            files
                .par_iter()
                .enumerate()
                .map(|(position, path)| {
                    if stop.load(Ordering::SeqCst) || cancel.is_cancelled() {
                        return None;
                    }
                    let result = self.process_file(policy, path, &log_names[position]);
                    let stops = result.unrecoverable
                        || (stop_on_failure && result.outcome == FileOutcome::Failure);
                    if stops {
                        warn!(file = %path.display(), "Stopping batch after failure");
                        stop.store(true, Ordering::SeqCst);
                    }
                    Some(result)
                })
                .collect()
        });

        let mut report = BatchReport::default();
        for (path, result) in files.iter().zip(processed) {
            match result {
                Some(result) => report.results.push(result),
                None => report.not_started.push(path.clone()),
            }
        }

        info!(
            succeeded = report.succeeded(),
            partial = report.partially_failed(),
            failed = report.failed(),
            not_started = report.not_started.len(),
            "Batch finished"
        );
        Ok(report)
    }

    fn logger_for(&self, name: &str) -> JobLogger {
        let config = self.executor.log_config().clone();
        match &self.logs_folder {
            Some(folder) => JobLogger::new(name, folder, config.clone(), None).unwrap_or_else(|e| {
                warn!("Could not create log file for {}: {}", name, e);
                JobLogger::detached(name, config)
            }),
            None => JobLogger::detached(name, config),
        }
    }

    fn process_file(&self, policy: &Policy, path: &Path, log_name: &str) -> BatchFileResult {
        let file_info = match self.executor.collaborators().introspector.get_file_info(path) {
            Ok(info) => info,
            Err(e) => {
                warn!(file = %path.display(), "Introspection failed: {}", e);
                return BatchFileResult::failed(path, e.to_string());
            }
        };

        let logger = self.logger_for(log_name);
        let evaluated = self.executor.evaluate_with_logger(
            path,
            file_info,
            policy,
            self.requested.as_deref(),
            &logger,
        );
        logger.close();

        match evaluated {
            Ok(report) => BatchFileResult {
                path: path.to_path_buf(),
                outcome: report.outcome,
                error: report
                    .failed_phase()
                    .and_then(|phase| phase.error.as_ref())
                    .map(|failure| failure.message.clone()),
                report: Some(report),
                unrecoverable: false,
            },
            Err(e) => {
                let unrecoverable = e.is_unrecoverable();
                let message = e.to_string();
                let report = match e {
                    ExecutionError::RollbackFailed { report, .. } => Some(*report),
                    _ => None,
                };
                BatchFileResult {
                    path: path.to_path_buf(),
                    outcome: FileOutcome::Failure,
                    report,
                    error: Some(message),
                    unrecoverable,
                }
            }
        }
    }
}

/// Log name per file: the file name, or, when two inputs share a file
/// name, every name prefixed with its 1-based batch position.
fn log_names(files: &[PathBuf]) -> Vec<String> {
    let names: Vec<String> = files.iter().map(|path| display_name(path)).collect();
    let mut seen = HashSet::new();
    if names.iter().all(|name| seen.insert(name.as_str())) {
        return names;
    }
    names
        .into_iter()
        .enumerate()
        .map(|(position, name)| format!("{:03}-{}", position + 1, name))
        .collect()
}
