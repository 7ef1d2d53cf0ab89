//! Media-related data structures (tracks, frame rates, file facts).

use serde::{Deserialize, Serialize};

use super::enums::{normalize_container_format, TrackType};

/// Frame rate kept as an exact rational.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub num: u32,
    pub den: u32,
}

impl FrameRate {
    pub fn new(num: u32, den: u32) -> Self {
        Self { num, den }
    }

    /// Compare two rates without converting to floating point.
    pub fn same_rate(&self, other: &FrameRate) -> bool {
        u64::from(self.num) * u64::from(other.den) == u64::from(other.num) * u64::from(self.den)
    }
}

impl std::fmt::Display for FrameRate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

fn default_lang() -> String {
    "und".to_string()
}

/// A single track as reported by one introspection pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackInfo {
    /// Position of the track in the container, stable for one introspection pass.
    pub index: usize,
    #[serde(rename = "type")]
    pub track_type: TrackType,
    /// Codec identifier (e.g., "hevc", "aac", "subrip").
    pub codec: String,
    /// ISO 639-2/B code or "und".
    #[serde(default = "default_lang")]
    pub language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_forced: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_rate: Option<FrameRate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    /// Bits per second, when the container reports it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
}

impl TrackInfo {
    /// Create a track with the required fields; language defaults to "und".
    pub fn new(index: usize, track_type: TrackType, codec: impl Into<String>) -> Self {
        Self {
            index,
            track_type,
            codec: codec.into(),
            language: default_lang(),
            title: None,
            is_default: false,
            is_forced: false,
            channels: None,
            width: None,
            height: None,
            frame_rate: None,
            duration_seconds: None,
            bitrate: None,
        }
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_default(mut self, is_default: bool) -> Self {
        self.is_default = is_default;
        self
    }

    pub fn with_forced(mut self, is_forced: bool) -> Self {
        self.is_forced = is_forced;
        self
    }

    pub fn with_channels(mut self, channels: u32) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn with_dimensions(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    pub fn with_frame_rate(mut self, frame_rate: FrameRate) -> Self {
        self.frame_rate = Some(frame_rate);
        self
    }

    pub fn with_duration(mut self, seconds: f64) -> Self {
        self.duration_seconds = Some(seconds);
        self
    }

    pub fn with_bitrate(mut self, bitrate: u64) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// Title, or an empty string when the track has none.
    pub fn title_str(&self) -> &str {
        self.title.as_deref().unwrap_or("")
    }

    /// Short description used in log lines and condition traces.
    pub fn describe(&self) -> String {
        format!("track[{}] {} {}", self.index, self.codec, self.language)
    }
}

/// Facts about one file: its container and its tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Normalized container name ("mkv", "mp4", ...).
    pub container_format: String,
    pub tracks: Vec<TrackInfo>,
}

impl FileInfo {
    pub fn new(container_format: &str, tracks: Vec<TrackInfo>) -> Self {
        Self {
            container_format: normalize_container_format(container_format),
            tracks,
        }
    }

    /// Tracks of one type, in container order.
    pub fn tracks_of(&self, track_type: TrackType) -> impl Iterator<Item = &TrackInfo> {
        self.tracks
            .iter()
            .filter(move |t| t.track_type == track_type)
    }

    /// The first video track, if any.
    pub fn video_track(&self) -> Option<&TrackInfo> {
        self.tracks_of(TrackType::Video).next()
    }

    pub fn track(&self, index: usize) -> Option<&TrackInfo> {
        self.tracks.iter().find(|t| t.index == index)
    }

    pub fn track_mut(&mut self, index: usize) -> Option<&mut TrackInfo> {
        self.tracks.iter_mut().find(|t| t.index == index)
    }

    /// Reassign indices to match container order.
    pub fn renumber(&mut self) {
        for (i, track) in self.tracks.iter_mut().enumerate() {
            track.index = i;
        }
    }
}
