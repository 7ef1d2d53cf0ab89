//! The closed set of operations a phase can contain.

use serde::{Deserialize, Serialize};

use crate::actions::ConditionalRule;
use crate::disposition::{AttachmentFilterConfig, AudioFilterConfig, SubtitleFilterConfig};
use crate::synthesis::AudioSynthesisConfig;
use crate::transcode::{ContainerConfig, TranscodeConfig};

/// Categories tracks are grouped into for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackCategory {
    Video,
    AudioMain,
    AudioAlternate,
    AudioCommentary,
    SubtitleMain,
    SubtitleForced,
    SubtitleCommentary,
    Attachment,
}

impl TrackCategory {
    pub const ALL: [TrackCategory; 8] = [
        TrackCategory::Video,
        TrackCategory::AudioMain,
        TrackCategory::AudioAlternate,
        TrackCategory::AudioCommentary,
        TrackCategory::SubtitleMain,
        TrackCategory::SubtitleForced,
        TrackCategory::SubtitleCommentary,
        TrackCategory::Attachment,
    ];
}

fn default_track_order() -> Vec<TrackCategory> {
    TrackCategory::ALL.to_vec()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackOrderConfig {
    #[serde(default = "default_track_order")]
    pub order: Vec<TrackCategory>,
}

impl Default for TrackOrderConfig {
    fn default() -> Self {
        Self {
            order: default_track_order(),
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultFlagsConfig {
    #[serde(default = "default_true")]
    pub set_first_video_default: bool,
    #[serde(default = "default_true")]
    pub set_preferred_audio_default: bool,
    #[serde(default)]
    pub set_preferred_subtitle_default: bool,
    #[serde(default = "default_true")]
    pub clear_other_defaults: bool,
}

impl Default for DefaultFlagsConfig {
    fn default() -> Self {
        Self {
            set_first_video_default: true,
            set_preferred_audio_default: true,
            set_preferred_subtitle_default: false,
            clear_other_defaults: true,
        }
    }
}

fn default_transcription_confidence() -> f64 {
    0.8
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TranscriptionConfig {
    /// Retag a track when the sample vote picks another language confidently enough.
    #[serde(default)]
    pub update_language: bool,
    #[serde(default = "default_transcription_confidence")]
    pub confidence_threshold: f64,
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            update_language: false,
            confidence_threshold: default_transcription_confidence(),
        }
    }
}

/// One typed unit of phase behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Container(ContainerConfig),
    AudioFilter(AudioFilterConfig),
    SubtitleFilter(SubtitleFilterConfig),
    AttachmentFilter(AttachmentFilterConfig),
    TrackOrder(TrackOrderConfig),
    DefaultFlags(DefaultFlagsConfig),
    Conditional(Vec<ConditionalRule>),
    AudioSynthesis(AudioSynthesisConfig),
    Transcode(TranscodeConfig),
    Transcription(TranscriptionConfig),
}

/// Operation discriminant. Declaration order is the canonical execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Container,
    AudioFilter,
    SubtitleFilter,
    AttachmentFilter,
    TrackOrder,
    DefaultFlags,
    Conditional,
    AudioSynthesis,
    Transcode,
    Transcription,
}

impl OperationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            OperationKind::Container => "container",
            OperationKind::AudioFilter => "audio_filter",
            OperationKind::SubtitleFilter => "subtitle_filter",
            OperationKind::AttachmentFilter => "attachment_filter",
            OperationKind::TrackOrder => "track_order",
            OperationKind::DefaultFlags => "default_flags",
            OperationKind::Conditional => "conditional",
            OperationKind::AudioSynthesis => "audio_synthesis",
            OperationKind::Transcode => "transcode",
            OperationKind::Transcription => "transcription",
        }
    }

    /// Position in the canonical execution order.
    pub fn rank(&self) -> u8 {
        *self as u8
    }
}

impl std::fmt::Display for OperationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Operation {
    pub fn kind(&self) -> OperationKind {
        match self {
            Operation::Container(_) => OperationKind::Container,
            Operation::AudioFilter(_) => OperationKind::AudioFilter,
            Operation::SubtitleFilter(_) => OperationKind::SubtitleFilter,
            Operation::AttachmentFilter(_) => OperationKind::AttachmentFilter,
            Operation::TrackOrder(_) => OperationKind::TrackOrder,
            Operation::DefaultFlags(_) => OperationKind::DefaultFlags,
            Operation::Conditional(_) => OperationKind::Conditional,
            Operation::AudioSynthesis(_) => OperationKind::AudioSynthesis,
            Operation::Transcode(_) => OperationKind::Transcode,
            Operation::Transcription(_) => OperationKind::Transcription,
        }
    }
}
