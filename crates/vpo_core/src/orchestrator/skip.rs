//! Phase-level `skip_when` and `depends_on` checks.

use tracing::debug;

use crate::models::{
    codec_in, codecs_match, languages_match, normalize_container_format, FileInfo, TrackType,
};
use crate::policy::{Phase, PhaseSkipCondition};
use crate::transcode::resolution_preset;

use super::types::{PhaseReport, PhaseStatus};

/// Resolution label for a video height, by the usual thresholds.
pub fn resolution_label(height: u32) -> &'static str {
    match height {
        h if h >= 4320 => "8k",
        h if h >= 2160 => "2160p",
        h if h >= 1440 => "1440p",
        h if h >= 1080 => "1080p",
        h if h >= 720 => "720p",
        _ => "480p",
    }
}

fn normalize_resolution(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    if lower == "4k" {
        "2160p".to_string()
    } else {
        lower
    }
}

/// Why `condition` skips the phase for this file, if it does.
///
/// Conditions are OR-combined. A condition that needs a fact the file does
/// not have (no video track, unknown height) never matches.
pub fn skip_reason(condition: &PhaseSkipCondition, file: &FileInfo) -> Option<String> {
    let video = file.video_track();

    if let (Some(codecs), Some(video)) = (&condition.video_codec, video) {
        if codec_in(&video.codec, codecs) {
            return Some(format!("video_codec matches [{}]", codecs.join(", ")));
        }
    }

    if let Some(codec) = &condition.audio_codec_exists {
        if file
            .tracks_of(TrackType::Audio)
            .any(|t| codecs_match(&t.codec, codec))
        {
            return Some(format!("audio_codec_exists: {}", codec));
        }
    }

    if let Some(language) = &condition.subtitle_language_exists {
        if file
            .tracks_of(TrackType::Subtitle)
            .any(|t| languages_match(&t.language, language))
        {
            return Some(format!("subtitle_language_exists: {}", language));
        }
    }

    if let Some(containers) = &condition.container {
        let actual = normalize_container_format(&file.container_format);
        if containers
            .iter()
            .any(|c| normalize_container_format(c) == actual)
        {
            return Some(format!("container matches [{}]", containers.join(", ")));
        }
    }

    let height = video.and_then(|v| v.height);

    if let (Some(target), Some(height)) = (&condition.resolution, height) {
        if resolution_label(height) == normalize_resolution(target) {
            return Some(format!("resolution matches {}", target));
        }
    }

    if let (Some(target), Some(height)) = (&condition.resolution_under, height) {
        if let Some((_, threshold)) = resolution_preset(target) {
            if height < threshold {
                return Some(format!(
                    "resolution ({}) under {}",
                    resolution_label(height),
                    target
                ));
            }
        }
    }

    debug!("No skip_when condition matched");
    None
}

/// The first dependency of `phase` that has not committed in this run.
pub fn unmet_dependency(phase: &Phase, reports: &[PhaseReport]) -> Option<String> {
    phase.depends_on().iter().find_map(|dependency| {
        let status = reports
            .iter()
            .find(|r| r.name.eq_ignore_ascii_case(dependency))
            .map_or(PhaseStatus::Pending, |r| r.status);
        (status != PhaseStatus::Committed).then(|| {
            format!(
                "dependency '{}' did not complete (status: {:?})",
                dependency, status
            )
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TrackInfo;

    fn file() -> FileInfo {
        FileInfo::new(
            "matroska,webm",
            vec![
                TrackInfo::new(0, TrackType::Video, "hevc").with_dimensions(1920, 1080),
                TrackInfo::new(1, TrackType::Audio, "eac3").with_language("eng"),
                TrackInfo::new(2, TrackType::Subtitle, "subrip").with_language("fre"),
            ],
        )
    }

    #[test]
    fn labels_heights() {
        assert_eq!(resolution_label(1080), "1080p");
        assert_eq!(resolution_label(800), "720p");
        assert_eq!(resolution_label(2160), "2160p");
        assert_eq!(resolution_label(360), "480p");
    }

    #[test]
    fn any_condition_skips() {
        let cond = PhaseSkipCondition {
            video_codec: Some(vec!["h265".into()]),
            ..Default::default()
        };
        assert!(skip_reason(&cond, &file()).unwrap().contains("video_codec"));

        let cond = PhaseSkipCondition {
            video_codec: Some(vec!["av1".into()]),
            subtitle_language_exists: Some("fra".into()),
            ..Default::default()
        };
        assert_eq!(
            skip_reason(&cond, &file()).as_deref(),
            Some("subtitle_language_exists: fra")
        );
    }

    #[test]
    fn container_and_resolution() {
        let cond = PhaseSkipCondition {
            container: Some(vec!["mkv".into()]),
            ..Default::default()
        };
        assert!(skip_reason(&cond, &file()).is_some());

        let cond = PhaseSkipCondition {
            resolution: Some("1080p".into()),
            ..Default::default()
        };
        assert!(skip_reason(&cond, &file()).is_some());

        let cond = PhaseSkipCondition {
            resolution_under: Some("1080p".into()),
            ..Default::default()
        };
        assert!(skip_reason(&cond, &file()).is_none());

        let cond = PhaseSkipCondition {
            resolution_under: Some("4k".into()),
            ..Default::default()
        };
        assert_eq!(
            skip_reason(&cond, &file()).as_deref(),
            Some("resolution (1080p) under 4k")
        );
    }
}
