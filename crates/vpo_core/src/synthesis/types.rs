//! Audio synthesis rule and plan types.

use serde::{Deserialize, Serialize};

use crate::conditions::{Comparison, Condition};

/// Codecs a synthesized track can be encoded with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SynthesisCodec {
    Eac3,
    Aac,
    Ac3,
    Opus,
    Flac,
}

impl SynthesisCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            SynthesisCodec::Eac3 => "eac3",
            SynthesisCodec::Aac => "aac",
            SynthesisCodec::Ac3 => "ac3",
            SynthesisCodec::Opus => "opus",
            SynthesisCodec::Flac => "flac",
        }
    }

    pub fn is_lossless(&self) -> bool {
        matches!(self, SynthesisCodec::Flac)
    }
}

impl std::fmt::Display for SynthesisCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Target channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChannelLayout {
    #[serde(rename = "mono")]
    Mono,
    #[serde(rename = "stereo")]
    Stereo,
    #[serde(rename = "5.1")]
    Surround51,
    #[serde(rename = "7.1")]
    Surround71,
}

impl ChannelLayout {
    pub fn channels(&self) -> u32 {
        match self {
            ChannelLayout::Mono => 1,
            ChannelLayout::Stereo => 2,
            ChannelLayout::Surround51 => 6,
            ChannelLayout::Surround71 => 8,
        }
    }
}

/// `max` / `min` relative to the other audio tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKeyword {
    Max,
    Min,
}

/// Channel criterion for `skip_if_exists` and source preferences.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelMatch {
    Exact(u32),
    Relative(ChannelKeyword),
    Range(Comparison),
}

/// Existing-track check that turns a rule into a no-op.
///
/// A single audio track must satisfy every criterion that is set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipIfExists {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<ChannelMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Vec<String>>,
    #[serde(default)]
    pub not_commentary: bool,
}

/// One criterion of the ordered source-preference list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourcePreference {
    Language(Vec<String>),
    NotCommentary,
    Codec(Vec<String>),
    Channels(ChannelMatch),
}

/// Inherit from the source track or use an explicit value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Inherited {
    #[default]
    Inherit,
    Value(String),
}

/// Where the new track goes among the audio tracks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackPosition {
    AfterSource,
    #[default]
    End,
    /// 1-based audio position.
    Index(usize),
}

/// A rule describing one synthesized audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SynthesisRule {
    pub name: String,
    pub codec: SynthesisCodec,
    pub channels: ChannelLayout,
    #[serde(default)]
    pub prefer: Vec<SourcePreference>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_if_exists: Option<SkipIfExists>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_if: Option<Condition>,
    /// Bitrate such as "640k"; codec default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    #[serde(default)]
    pub title: Inherited,
    #[serde(default)]
    pub language: Inherited,
    #[serde(default)]
    pub position: TrackPosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioSynthesisConfig {
    pub tracks: Vec<SynthesisRule>,
}

/// Why a rule produced no track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisSkipReason {
    ConditionNotMet,
    NoSourceAvailable,
    WouldUpmix,
    AlreadyExists,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedSynthesis {
    pub rule_name: String,
    pub reason: SynthesisSkipReason,
    pub details: String,
}

/// Channel reduction applied while encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Downmix {
    pub from_channels: u32,
    pub to_channels: u32,
}

/// Descriptor of a new audio track to create.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SynthesisOperation {
    pub rule_name: String,
    pub source_track_index: usize,
    pub codec: SynthesisCodec,
    pub channels: u32,
    /// Bits per second; `None` for lossless codecs.
    pub bitrate: Option<u64>,
    pub title: Option<String>,
    pub language: String,
    /// 0-based position among audio tracks after insertion.
    pub audio_position: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downmix: Option<Downmix>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SynthesisPlan {
    pub operations: Vec<SynthesisOperation>,
    pub skipped: Vec<SkippedSynthesis>,
}

impl SynthesisPlan {
    pub fn is_noop(&self) -> bool {
        self.operations.is_empty()
    }
}
