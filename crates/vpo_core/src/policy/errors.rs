//! Policy validation and policy-driven error types.

use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

use crate::models::{ContainerFormat, TrackType};

/// One problem found while validating a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    /// Dotted path to the offending field, e.g. `phases[1].audio_filter.languages`.
    pub path: String,
    pub message: String,
}

impl FieldError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for FieldError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path, self.message)
    }
}

/// A policy was rejected. Lists every problem found, never just the first.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Policy validation failed: {}", join_errors(.errors))]
pub struct SchemaValidationError {
    pub errors: Vec<FieldError>,
}

impl SchemaValidationError {
    pub fn single(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(path, message)],
        }
    }

    /// True if any error is reported for exactly this path.
    pub fn has_error_at(&self, path: &str) -> bool {
        self.errors.iter().any(|e| e.path == path)
    }
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

fn join_tracks(tracks: &[IncompatibleTrack]) -> String {
    tracks
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// A track a target container cannot carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IncompatibleTrack {
    pub track_index: usize,
    pub track_type: TrackType,
    pub codec: String,
}

impl std::fmt::Display for IncompatibleTrack {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{} {} ({})", self.track_index, self.track_type, self.codec)
    }
}

/// Errors raised while applying a policy to a file.
#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("Rule '{rule_name}' failed for {}: {message}", .file_path.display())]
    ConditionalFail {
        rule_name: String,
        file_path: PathBuf,
        message: String,
    },

    #[error(
        "Insufficient {track_type} tracks: {available} kept, minimum is {minimum} \
         (policy languages: [{}], file languages: [{}])",
        .policy_languages.join(", "),
        .file_languages.join(", ")
    )]
    InsufficientTracks {
        track_type: TrackType,
        minimum: usize,
        available: usize,
        policy_languages: Vec<String>,
        file_languages: Vec<String>,
    },

    #[error(
        "Cannot convert to {target_container}: incompatible tracks {}",
        join_tracks(.offending_tracks)
    )]
    IncompatibleCodec {
        target_container: ContainerFormat,
        offending_tracks: Vec<IncompatibleTrack>,
    },
}

impl PolicyError {
    pub fn conditional_fail(
        rule_name: impl Into<String>,
        file_path: &Path,
        message: impl Into<String>,
    ) -> Self {
        PolicyError::ConditionalFail {
            rule_name: rule_name.into(),
            file_path: file_path.to_path_buf(),
            message: message.into(),
        }
    }

    /// Ways a user could change the policy to avoid this error.
    pub fn remediations(&self) -> Vec<String> {
        match self {
            PolicyError::InsufficientTracks {
                track_type,
                minimum,
                file_languages,
                ..
            } => {
                let mut hints = Vec::new();
                if !file_languages.is_empty() {
                    hints.push(format!(
                        "add one of [{}] to the {} language list",
                        file_languages.join(", "),
                        track_type
                    ));
                }
                if *minimum > 1 {
                    hints.push(format!("lower minimum below {}", minimum));
                }
                hints.push(
                    "set fallback.mode to keep_all, keep_first or content_language".to_string(),
                );
                hints
            }
            PolicyError::IncompatibleCodec { .. } => vec![
                "set on_incompatible_codec to transcode or skip".to_string(),
                "choose a container that supports these codecs".to_string(),
            ],
            PolicyError::ConditionalFail { .. } => Vec::new(),
        }
    }
}

/// Result type for policy-driven decisions.
pub type PolicyResult<T> = Result<T, PolicyError>;
