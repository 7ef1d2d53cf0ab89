//! Filter configuration and disposition types.

use serde::{Deserialize, Serialize};

use crate::models::TrackType;

/// Keep or drop a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DispositionAction {
    Keep,
    Remove,
}

impl std::fmt::Display for DispositionAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DispositionAction::Keep => write!(f, "KEEP"),
            DispositionAction::Remove => write!(f, "REMOVE"),
        }
    }
}

/// Decision for one track, with the reason it was made.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDisposition {
    pub track_index: usize,
    pub track_type: TrackType,
    pub action: DispositionAction,
    pub reason: String,
}

impl TrackDisposition {
    pub fn keep(track_index: usize, track_type: TrackType, reason: impl Into<String>) -> Self {
        Self {
            track_index,
            track_type,
            action: DispositionAction::Keep,
            reason: reason.into(),
        }
    }

    pub fn remove(track_index: usize, track_type: TrackType, reason: impl Into<String>) -> Self {
        Self {
            track_index,
            track_type,
            action: DispositionAction::Remove,
            reason: reason.into(),
        }
    }

    pub fn is_keep(&self) -> bool {
        self.action == DispositionAction::Keep
    }
}

/// Recovery strategy when the audio filter keeps too few tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackMode {
    /// Keep every track in the most common audio language.
    ContentLanguage,
    /// Undo the audio filter.
    KeepAll,
    /// Keep only the first audio track.
    KeepFirst,
    /// Raise an insufficient-tracks error.
    Error,
}

impl std::fmt::Display for FallbackMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FallbackMode::ContentLanguage => write!(f, "content_language"),
            FallbackMode::KeepAll => write!(f, "keep_all"),
            FallbackMode::KeepFirst => write!(f, "keep_first"),
            FallbackMode::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackConfig {
    pub mode: FallbackMode,
}

fn default_minimum() -> usize {
    1
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFilterConfig {
    /// Languages to keep; must not be empty.
    pub languages: Vec<String>,
    #[serde(default = "default_minimum")]
    pub minimum: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<FallbackConfig>,
}

impl AudioFilterConfig {
    pub fn new(languages: &[&str]) -> Self {
        Self {
            languages: languages.iter().map(|l| l.to_string()).collect(),
            minimum: default_minimum(),
            fallback: None,
        }
    }

    pub fn with_fallback(mut self, mode: FallbackMode) -> Self {
        self.fallback = Some(FallbackConfig { mode });
        self
    }

    pub fn with_minimum(mut self, minimum: usize) -> Self {
        self.minimum = minimum;
        self
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtitleFilterConfig {
    /// Languages to keep; `None` keeps every language.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub languages: Option<Vec<String>>,
    #[serde(default)]
    pub preserve_forced: bool,
    #[serde(default)]
    pub remove_all: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentFilterConfig {
    #[serde(default)]
    pub remove_all: bool,
}

/// Dispositions for every track plus any warnings raised.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispositionPlan {
    pub dispositions: Vec<TrackDisposition>,
    pub warnings: Vec<String>,
}

impl DispositionPlan {
    pub fn kept(&self) -> impl Iterator<Item = &TrackDisposition> {
        self.dispositions.iter().filter(|d| d.is_keep())
    }

    pub fn removed(&self) -> impl Iterator<Item = &TrackDisposition> {
        self.dispositions.iter().filter(|d| !d.is_keep())
    }

    pub fn removed_indices(&self) -> Vec<usize> {
        self.removed().map(|d| d.track_index).collect()
    }

    /// True when nothing would be removed.
    pub fn is_noop(&self) -> bool {
        self.removed().next().is_none()
    }
}
