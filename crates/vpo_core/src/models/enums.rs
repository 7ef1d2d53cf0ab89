//! Core enums used throughout the engine.

use serde::{Deserialize, Serialize};

/// Type of media track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackType {
    Video,
    Audio,
    Subtitle,
    Attachment,
    Other,
}

impl TrackType {
    /// Lowercase name used in reasons and policy documents.
    pub fn as_str(&self) -> &'static str {
        match self {
            TrackType::Video => "video",
            TrackType::Audio => "audio",
            TrackType::Subtitle => "subtitle",
            TrackType::Attachment => "attachment",
            TrackType::Other => "other",
        }
    }
}

impl std::fmt::Display for TrackType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which boolean track flag an edit touches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagType {
    Default,
    Forced,
}

impl std::fmt::Display for FlagType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FlagType::Default => write!(f, "default"),
            FlagType::Forced => write!(f, "forced"),
        }
    }
}

/// Container formats a file can be converted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Mkv,
    Mp4,
}

impl ContainerFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContainerFormat::Mkv => "mkv",
            ContainerFormat::Mp4 => "mp4",
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalize a container name reported by an introspector.
///
/// Matroska and WebM map to `mkv`, the ISO-BMFF family maps to `mp4`.
/// Anything else is lowercased and returned as-is.
pub fn normalize_container_format(raw: &str) -> String {
    let lower = raw.trim().trim_start_matches('.').to_ascii_lowercase();
    let first = lower.split(',').next().unwrap_or_default().trim();
    match first {
        "matroska" | "mkv" | "webm" | "mka" | "mks" => "mkv".to_string(),
        "mov" | "mp4" | "m4a" | "m4v" | "3gp" | "3g2" | "mj2" | "isom" | "qt" => "mp4".to_string(),
        other => other.to_string(),
    }
}
