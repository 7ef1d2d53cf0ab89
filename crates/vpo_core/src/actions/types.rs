//! Conditional rule and action types.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::conditions::Condition;
use crate::models::{SkipFlags, SkipType, TrackFlagChange, TrackType};

/// One action in a rule's `then` or `else` list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionalAction {
    Skip(SkipType),
    /// Message template; supports `{filename}`, `{path}` and `{rule_name}`.
    Warn(String),
    /// Message template; aborts the file when reached.
    Fail(String),
    /// Mark the first matching track as default.
    SetDefault(FlagAction),
    /// Mark every matching track as forced.
    SetForced(FlagAction),
}

/// Target tracks of a `set_default` / `set_forced` action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagAction {
    pub track_type: TrackType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default = "default_true")]
    pub value: bool,
}

fn default_true() -> bool {
    true
}

/// A named `when` / `then` / `else` rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalRule {
    pub name: String,
    pub when: Condition,
    #[serde(default)]
    pub then: Vec<ConditionalAction>,
    #[serde(default, rename = "else")]
    pub otherwise: Vec<ConditionalAction>,
}

/// Values available to message placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionContext {
    pub file_path: PathBuf,
    pub rule_name: String,
}

impl ActionContext {
    pub fn new(file_path: impl Into<PathBuf>, rule_name: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            rule_name: rule_name.into(),
        }
    }

    pub fn filename(&self) -> String {
        self.file_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }
}

/// What a conditional operation produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutcome {
    /// Accumulated flags, including those passed in.
    pub skip_flags: SkipFlags,
    pub warnings: Vec<String>,
    pub flag_changes: Vec<TrackFlagChange>,
    /// Trace of each rule evaluation, in order.
    pub evaluations: Vec<RuleEvaluation>,
}

impl ActionOutcome {
    pub fn new(skip_flags: SkipFlags) -> Self {
        Self {
            skip_flags,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleEvaluation {
    pub rule_name: String,
    pub matched: bool,
    pub reason: String,
}
