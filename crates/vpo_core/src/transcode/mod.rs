//! Transcode decisions: whether and how each video/audio track is re-encoded,
//! and what a container conversion requires of each track.

mod container;
mod decision;
mod types;

pub use container::{
    plan_container, ContainerConfig, ContainerPlan, ContainerTrackAction, IncompatibleCodecMode,
};
pub use decision::{
    default_crf, parse_bitrate, resolution_preset, scaled_dimensions, TranscodeDecisionEngine,
};
pub use types::{
    AudioAction, AudioDecision, AudioTranscodeConfig, HardwareAccelConfig, HardwareAccelMode,
    QualityMode, QualitySettings, ResolvedQuality, ScaleAlgorithm, ScaleTarget, ScalingSettings,
    TranscodeConfig, TranscodePlan, VideoCodec, VideoDecision, VideoSkipCondition,
    VideoTranscodeConfig, VideoTranscodeRequest,
};
