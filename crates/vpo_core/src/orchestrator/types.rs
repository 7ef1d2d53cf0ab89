//! Core types for phase execution: per-file state and reports.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::language::MultiLanguageDetectionResult;
use crate::models::{FileInfo, SkipFlags};
use crate::policy::OperationKind;

/// Lifecycle of one phase for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhaseStatus {
    Pending,
    Running,
    Committed,
    Skipped,
    RolledBack,
}

impl PhaseStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PhaseStatus::Committed | PhaseStatus::Skipped | PhaseStatus::RolledBack
        )
    }
}

/// Overall result for one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileOutcome {
    Running,
    Success,
    PartialFailure,
    Failure,
}

/// Everything later phases may depend on, threaded through the run.
///
/// Snapshots share this value by `Arc`; the executor clones it on write.
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionState {
    pub file_info: FileInfo,
    pub skip_flags: SkipFlags,
    /// Language analysis keyed by current track index.
    pub language_results: BTreeMap<usize, MultiLanguageDetectionResult>,
}

impl ExecutionState {
    pub fn new(file_info: FileInfo) -> Self {
        Self {
            file_info,
            skip_flags: SkipFlags::default(),
            language_results: BTreeMap::new(),
        }
    }

    /// Replace the track list with freshly introspected facts.
    ///
    /// Language results are kept for indices that still exist.
    pub fn refresh(&mut self, file_info: FileInfo) {
        let count = file_info.tracks.len();
        self.language_results.retain(|index, _| *index < count);
        self.file_info = file_info;
    }
}

/// Where and why a phase failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseFailure {
    /// Operation that raised, if the failure happened inside one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation: Option<OperationKind>,
    pub message: String,
}

/// Result of one phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseReport {
    pub name: String,
    pub status: PhaseStatus,
    pub change_count: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<PhaseFailure>,
}

impl PhaseReport {
    pub fn pending(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: PhaseStatus::Pending,
            change_count: 0,
            warnings: Vec::new(),
            skip_reason: None,
            error: None,
        }
    }

    pub(crate) fn skip(&mut self, reason: impl Into<String>) {
        self.status = PhaseStatus::Skipped;
        self.skip_reason = Some(reason.into());
    }
}

/// Result of evaluating one file against a policy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseExecutionReport {
    pub file_path: PathBuf,
    pub outcome: FileOutcome,
    pub phases: Vec<PhaseReport>,
    /// Skip flags accumulated over committed phases.
    pub skip_flags: SkipFlags,
    /// Track facts after the last committed phase.
    pub file_info: FileInfo,
}

impl PhaseExecutionReport {
    pub(crate) fn new(file_path: &Path, phase_names: &[&str], file_info: FileInfo) -> Self {
        Self {
            file_path: file_path.to_path_buf(),
            outcome: FileOutcome::Running,
            phases: phase_names.iter().map(|n| PhaseReport::pending(*n)).collect(),
            skip_flags: SkipFlags::default(),
            file_info,
        }
    }

    pub fn phase(&self, name: &str) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.name == name)
    }

    /// Sum of changes over committed phases.
    pub fn total_changes(&self) -> usize {
        self.phases
            .iter()
            .filter(|p| p.status == PhaseStatus::Committed)
            .map(|p| p.change_count)
            .sum()
    }

    pub fn is_success(&self) -> bool {
        self.outcome == FileOutcome::Success
    }

    /// The first phase that failed, if any.
    pub fn failed_phase(&self) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.error.is_some())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
