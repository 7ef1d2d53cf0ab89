//! Container conversion planning.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::models::{
    canonical_codec, is_bitmap_subtitle, ContainerFormat, FileInfo, TrackInfo, TrackType,
};
use crate::policy::{IncompatibleTrack, PolicyError, PolicyResult};

const MP4_VIDEO: &[&str] = &["h264", "hevc", "av1", "mpeg4", "vp9"];
const MP4_AUDIO: &[&str] = &["aac", "ac3", "eac3", "mp3", "flac", "opus", "alac"];
const MP4_SUBTITLE: &[&str] = &["mov_text", "webvtt"];
const MP4_CONVERTIBLE_SUBTITLE: &[&str] = &["subrip", "ass"];

/// What to do with tracks the target container cannot hold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncompatibleCodecMode {
    #[default]
    Error,
    Skip,
    Transcode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerConfig {
    pub target: ContainerFormat,
    #[serde(default)]
    pub on_incompatible_codec: IncompatibleCodecMode,
}

/// Per-track change needed to fit the target container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ContainerTrackAction {
    ConvertSubtitle { track_index: usize, to: String },
    TranscodeAudio { track_index: usize, to: String },
    Remove { track_index: usize, reason: String },
}

impl ContainerTrackAction {
    pub fn track_index(&self) -> usize {
        match self {
            ContainerTrackAction::ConvertSubtitle { track_index, .. }
            | ContainerTrackAction::TranscodeAudio { track_index, .. }
            | ContainerTrackAction::Remove { track_index, .. } => *track_index,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContainerPlan {
    pub target: ContainerFormat,
    /// The file is not already in the target container.
    pub convert: bool,
    pub track_actions: Vec<ContainerTrackAction>,
    /// Set when the conversion was skipped because of incompatible tracks.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub skipped: Option<String>,
}

impl ContainerPlan {
    pub fn is_noop(&self) -> bool {
        self.skipped.is_some() || (!self.convert && self.track_actions.is_empty())
    }
}

enum Compatibility {
    Compatible,
    Convertible(ContainerTrackAction),
    Incompatible,
}

fn mp4_compatibility(track: &TrackInfo, mode: IncompatibleCodecMode) -> Compatibility {
    let codec = canonical_codec(&track.codec);
    match track.track_type {
        TrackType::Video if MP4_VIDEO.contains(&codec.as_str()) => Compatibility::Compatible,
        TrackType::Video => Compatibility::Incompatible,
        TrackType::Audio if MP4_AUDIO.contains(&codec.as_str()) => Compatibility::Compatible,
        TrackType::Audio if mode == IncompatibleCodecMode::Transcode => {
            Compatibility::Convertible(ContainerTrackAction::TranscodeAudio {
                track_index: track.index,
                to: "aac".to_string(),
            })
        }
        TrackType::Audio => Compatibility::Incompatible,
        TrackType::Subtitle if MP4_SUBTITLE.contains(&codec.as_str()) => Compatibility::Compatible,
        TrackType::Subtitle if MP4_CONVERTIBLE_SUBTITLE.contains(&codec.as_str()) => {
            Compatibility::Convertible(ContainerTrackAction::ConvertSubtitle {
                track_index: track.index,
                to: "mov_text".to_string(),
            })
        }
        TrackType::Subtitle if is_bitmap_subtitle(&track.codec) => {
            Compatibility::Convertible(ContainerTrackAction::Remove {
                track_index: track.index,
                reason: "bitmap subtitles cannot be stored in mp4".to_string(),
            })
        }
        TrackType::Subtitle => Compatibility::Incompatible,
        TrackType::Attachment | TrackType::Other => {
            Compatibility::Convertible(ContainerTrackAction::Remove {
                track_index: track.index,
                reason: format!("{} tracks cannot be stored in mp4", track.track_type),
            })
        }
    }
}

/// Plan the conversion of `file` into the configured container.
///
/// Incompatible video always fails unless the mode is `skip`. Other
/// incompatible tracks fail under `error`, skip the conversion under `skip`
/// and are converted under `transcode`.
pub fn plan_container(file: &FileInfo, config: &ContainerConfig) -> PolicyResult<ContainerPlan> {
    let convert = file.container_format != config.target.as_str();
    let mut plan = ContainerPlan {
        target: config.target,
        convert,
        track_actions: Vec::new(),
        skipped: None,
    };
    if config.target == ContainerFormat::Mkv {
        return Ok(plan);
    }

    let mut offending = Vec::new();
    let mut video_offending = false;
    for track in &file.tracks {
        match mp4_compatibility(track, config.on_incompatible_codec) {
            Compatibility::Compatible => {}
            Compatibility::Convertible(action) => plan.track_actions.push(action),
            Compatibility::Incompatible => {
                video_offending |= track.track_type == TrackType::Video;
                offending.push(IncompatibleTrack {
                    track_index: track.index,
                    track_type: track.track_type,
                    codec: track.codec.clone(),
                });
            }
        }
    }

    let mode = config.on_incompatible_codec;
    if mode == IncompatibleCodecMode::Skip && !offending.is_empty() {
        let reason = format!("{} track(s) incompatible with {}", offending.len(), config.target);
        info!(%reason, "Container conversion skipped");
        plan.track_actions.clear();
        plan.skipped = Some(reason);
        return Ok(plan);
    }
    if !offending.is_empty() && (mode == IncompatibleCodecMode::Error || video_offending) {
        return Err(PolicyError::IncompatibleCodec {
            target_container: config.target,
            offending_tracks: offending,
        });
    }

    debug!(target = %config.target, actions = plan.track_actions.len(), "Container plan ready");
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(mode: IncompatibleCodecMode) -> ContainerConfig {
        ContainerConfig {
            target: ContainerFormat::Mp4,
            on_incompatible_codec: mode,
        }
    }

    fn mkv_file() -> FileInfo {
        FileInfo::new(
            "matroska,webm",
            vec![
                TrackInfo::new(0, TrackType::Video, "h264"),
                TrackInfo::new(1, TrackType::Audio, "truehd"),
                TrackInfo::new(2, TrackType::Subtitle, "subrip"),
                TrackInfo::new(3, TrackType::Subtitle, "hdmv_pgs_subtitle"),
                TrackInfo::new(4, TrackType::Attachment, "ttf"),
            ],
        )
    }

    #[test]
    fn mkv_accepts_everything() {
        let file = FileInfo::new("mkv", vec![TrackInfo::new(0, TrackType::Video, "prores")]);
        let target = ContainerConfig {
            target: ContainerFormat::Mkv,
            on_incompatible_codec: IncompatibleCodecMode::Error,
        };
        assert!(plan_container(&file, &target).unwrap().is_noop());
    }

    #[test]
    fn transcode_mode_converts_tracks() {
        let plan = plan_container(&mkv_file(), &config(IncompatibleCodecMode::Transcode)).unwrap();
        assert!(plan.convert);
        assert_eq!(
            plan.track_actions,
            vec![
                ContainerTrackAction::TranscodeAudio {
                    track_index: 1,
                    to: "aac".to_string()
                },
                ContainerTrackAction::ConvertSubtitle {
                    track_index: 2,
                    to: "mov_text".to_string()
                },
                ContainerTrackAction::Remove {
                    track_index: 3,
                    reason: "bitmap subtitles cannot be stored in mp4".to_string()
                },
                ContainerTrackAction::Remove {
                    track_index: 4,
                    reason: "attachment tracks cannot be stored in mp4".to_string()
                },
            ]
        );
    }

    #[test]
    fn error_mode_reports_offenders() {
        let err = plan_container(&mkv_file(), &config(IncompatibleCodecMode::Error)).unwrap_err();
        match err {
            PolicyError::IncompatibleCodec {
                target_container,
                offending_tracks,
            } => {
                assert_eq!(target_container, ContainerFormat::Mp4);
                assert_eq!(offending_tracks.len(), 1);
                assert_eq!(offending_tracks[0].codec, "truehd");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn skip_mode_leaves_file_alone() {
        let plan = plan_container(&mkv_file(), &config(IncompatibleCodecMode::Skip)).unwrap();
        assert!(plan.is_noop());
        assert!(plan.skipped.is_some());
    }

    #[test]
    fn incompatible_video_always_fails() {
        let file = FileInfo::new("mkv", vec![TrackInfo::new(0, TrackType::Video, "mpeg2video")]);
        assert!(plan_container(&file, &config(IncompatibleCodecMode::Transcode)).is_err());
    }
}
