//! Per-track transcode decisions.

use tracing::debug;

use crate::models::{canonical_codec, codec_in, codecs_match, SkipFlags, TrackInfo, TrackType};

use super::types::{
    AudioAction, AudioDecision, AudioTranscodeConfig, QualityMode, QualitySettings,
    ResolvedQuality, ScaleTarget, ScalingSettings, TranscodeConfig, TranscodePlan, VideoCodec,
    VideoDecision, VideoSkipCondition, VideoTranscodeConfig, VideoTranscodeRequest,
};

/// Parse "10M", "5000k" or a plain number into bits per second.
pub fn parse_bitrate(raw: &str) -> Option<u64> {
    let raw = raw.trim();
    let last = raw.chars().last()?;
    let (number, multiplier) = match last.to_ascii_lowercase() {
        'm' => (&raw[..raw.len() - 1], 1_000_000.0),
        'k' => (&raw[..raw.len() - 1], 1_000.0),
        _ => return raw.parse::<u64>().ok(),
    };
    let value: f64 = number.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then(|| (value * multiplier).round() as u64)
}

/// Maximum (width, height) for a resolution preset.
pub fn resolution_preset(name: &str) -> Option<(u32, u32)> {
    match name.trim().to_ascii_lowercase().as_str() {
        "480p" => Some((854, 480)),
        "720p" => Some((1280, 720)),
        "1080p" => Some((1920, 1080)),
        "1440p" => Some((2560, 1440)),
        "2160p" | "4k" => Some((3840, 2160)),
        "8k" => Some((7680, 4320)),
        _ => None,
    }
}

pub fn default_crf(codec: VideoCodec) -> u8 {
    match codec {
        VideoCodec::H264 => 23,
        VideoCodec::Hevc => 28,
        VideoCodec::Vp9 => 31,
        VideoCodec::Av1 => 30,
    }
}

/// Output size fitting within `max`, aspect preserved, even dimensions.
///
/// Returns `None` when no scaling is needed.
pub fn scaled_dimensions(
    width: u32,
    height: u32,
    max: (u32, u32),
    upscale: bool,
) -> Option<(u32, u32)> {
    if width == 0 || height == 0 {
        return None;
    }
    let (max_w, max_h) = max;
    let fits = width <= max_w && height <= max_h;
    if fits && !upscale {
        return None;
    }
    let factor = f64::min(max_w as f64 / width as f64, max_h as f64 / height as f64);
    let even = |v: f64| -> u32 { ((v / 2.0).round() as u32 * 2).max(2) };
    let target = (even(width as f64 * factor), even(height as f64 * factor));
    (target != (width, height)).then_some(target)
}

/// Decides what happens to each video and audio track.
pub struct TranscodeDecisionEngine<'a> {
    tracks: &'a [TrackInfo],
    skip_flags: SkipFlags,
}

impl<'a> TranscodeDecisionEngine<'a> {
    pub fn new(tracks: &'a [TrackInfo], skip_flags: SkipFlags) -> Self {
        Self { tracks, skip_flags }
    }

    pub fn plan(&self, config: &TranscodeConfig) -> TranscodePlan {
        let video = config.video.as_ref().and_then(|video| self.decide_video(video));
        let audio = config
            .audio
            .as_ref()
            .map(|audio| self.decide_audio(audio))
            .unwrap_or_default();
        TranscodePlan { video, audio }
    }

    fn decide_video(&self, config: &VideoTranscodeConfig) -> Option<VideoDecision> {
        let track = self.tracks.iter().find(|t| t.track_type == TrackType::Video)?;
        let skipped = |reason: String| {
            debug!(track = track.index, %reason, "Video transcode skipped");
            Some(VideoDecision::Skipped {
                track_index: track.index,
                reason,
            })
        };

        if self.skip_flags.skip_video_transcode {
            return skipped("skip_video_transcode set by conditional rule".to_string());
        }
        if let Some(condition) = &config.skip_if {
            if let Some(reason) = skip_condition_met(condition, track) {
                return skipped(reason);
            }
        }

        let scale = config.scaling.as_ref().and_then(|s| scale_target(s, track));
        if codecs_match(&track.codec, config.target_codec.as_str()) && scale.is_none() {
            return skipped(format!("already {}", config.target_codec));
        }

        Some(VideoDecision::Transcode(VideoTranscodeRequest {
            track_index: track.index,
            source_codec: track.codec.clone(),
            target_codec: config.target_codec,
            quality: resolve_quality(&config.quality, config.target_codec),
            scale,
            hardware: config.hardware_acceleration.enabled,
            fallback_to_cpu: config.hardware_acceleration.fallback_to_cpu,
        }))
    }

    fn decide_audio(&self, config: &AudioTranscodeConfig) -> Vec<AudioDecision> {
        let target = canonical_codec(&config.transcode_to);
        self.tracks
            .iter()
            .filter(|t| t.track_type == TrackType::Audio)
            .map(|track| {
                let action = if self.skip_flags.skip_audio_transcode {
                    AudioAction::Passthrough {
                        reason: "skip_audio_transcode set by conditional rule".to_string(),
                    }
                } else if codec_in(&track.codec, &config.preserve_codecs) {
                    AudioAction::Passthrough {
                        reason: format!("{} is preserved", track.codec),
                    }
                } else if canonical_codec(&track.codec) == target {
                    AudioAction::Passthrough {
                        reason: format!("already {}", target),
                    }
                } else {
                    AudioAction::Transcode {
                        codec: target.clone(),
                        bitrate: parse_bitrate(&config.bitrate),
                    }
                };
                AudioDecision {
                    track_index: track.index,
                    source_codec: track.codec.clone(),
                    action,
                }
            })
            .collect()
    }
}

/// Reason string when every set condition holds, `None` otherwise.
fn skip_condition_met(condition: &VideoSkipCondition, track: &TrackInfo) -> Option<String> {
    if condition.is_empty() {
        return None;
    }
    let mut reasons = Vec::new();

    if let Some(codecs) = &condition.codec_matches {
        if !codec_in(&track.codec, codecs) {
            return None;
        }
        reasons.push(format!("codec is {}", track.codec));
    }

    if let Some(preset) = &condition.resolution_within {
        if let (Some((max_w, max_h)), Some(w), Some(h)) =
            (resolution_preset(preset), track.width, track.height)
        {
            if w > max_w || h > max_h {
                return None;
            }
            reasons.push(format!("resolution {}x{} within {}", w, h, preset));
        }
    }

    if let Some(limit) = &condition.bitrate_under {
        if let (Some(threshold), Some(bitrate)) = (parse_bitrate(limit), track.bitrate) {
            if bitrate >= threshold {
                return None;
            }
            reasons.push(format!("bitrate under {}", limit));
        }
    }

    if reasons.is_empty() {
        Some("all conditions met".to_string())
    } else {
        Some(format!("already compliant: {}", reasons.join(", ")))
    }
}

fn scale_target(settings: &ScalingSettings, track: &TrackInfo) -> Option<ScaleTarget> {
    let max = resolution_preset(settings.max_resolution.as_deref()?)?;
    let (width, height) = scaled_dimensions(track.width?, track.height?, max, settings.upscale)?;
    Some(ScaleTarget {
        width,
        height,
        algorithm: settings.algorithm,
    })
}

fn resolve_quality(settings: &QualitySettings, codec: VideoCodec) -> ResolvedQuality {
    let crf = match settings.mode {
        QualityMode::Bitrate => None,
        QualityMode::Crf | QualityMode::ConstrainedQuality => {
            Some(settings.crf.unwrap_or_else(|| default_crf(codec)))
        }
    };
    let bitrate = match settings.mode {
        QualityMode::Bitrate => settings.bitrate.as_deref().and_then(parse_bitrate),
        _ => None,
    };
    let max_bitrate = match settings.mode {
        QualityMode::Crf => None,
        _ => settings.max_bitrate.as_deref().and_then(parse_bitrate),
    };
    ResolvedQuality {
        mode: settings.mode,
        crf,
        bitrate,
        max_bitrate,
        preset: settings.preset.clone(),
        tune: settings.tune.clone(),
        two_pass: settings.two_pass,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SkipType;
    use crate::transcode::{HardwareAccelMode, ScaleAlgorithm};

    fn tracks() -> Vec<TrackInfo> {
        vec![
            TrackInfo::new(0, TrackType::Video, "hevc")
                .with_dimensions(3840, 2160)
                .with_bitrate(25_000_000),
            TrackInfo::new(1, TrackType::Audio, "truehd").with_channels(8),
            TrackInfo::new(2, TrackType::Audio, "dts").with_channels(6),
            TrackInfo::new(3, TrackType::Audio, "aac").with_channels(2),
        ]
    }

    fn skip_codec(codecs: &[&str]) -> VideoSkipCondition {
        VideoSkipCondition {
            codec_matches: Some(codecs.iter().map(|c| c.to_string()).collect()),
            ..VideoSkipCondition::default()
        }
    }

    #[test]
    fn bitrate_strings() {
        assert_eq!(parse_bitrate("10M"), Some(10_000_000));
        assert_eq!(parse_bitrate("5000k"), Some(5_000_000));
        assert_eq!(parse_bitrate("1.5m"), Some(1_500_000));
        assert_eq!(parse_bitrate("128000"), Some(128_000));
        assert_eq!(parse_bitrate("fast"), None);
        assert_eq!(parse_bitrate(""), None);
    }

    #[test]
    fn codec_match_skips_video() {
        let tracks = tracks();
        let mut video = VideoTranscodeConfig::new(VideoCodec::Hevc);
        video.skip_if = Some(skip_codec(&["hevc"]));
        let config = TranscodeConfig {
            video: Some(video),
            audio: None,
        };
        let plan = TranscodeDecisionEngine::new(&tracks, SkipFlags::default()).plan(&config);
        assert!(matches!(plan.video, Some(VideoDecision::Skipped { .. })));
        assert_eq!(plan.request_count(), 0);
    }

    #[test]
    fn skip_conditions_are_and_combined() {
        let tracks = tracks();
        let mut condition = skip_codec(&["hevc"]);
        condition.resolution_within = Some("1080p".to_string());
        assert!(skip_condition_met(&condition, &tracks[0]).is_none());

        condition.resolution_within = Some("4k".to_string());
        condition.bitrate_under = Some("30M".to_string());
        assert!(skip_condition_met(&condition, &tracks[0]).is_some());
    }

    #[test]
    fn unknown_properties_do_not_block_skip() {
        let track = TrackInfo::new(0, TrackType::Video, "h264");
        let condition = VideoSkipCondition {
            resolution_within: Some("720p".to_string()),
            bitrate_under: Some("5M".to_string()),
            ..VideoSkipCondition::default()
        };
        assert!(skip_condition_met(&condition, &track).is_some());
    }

    #[test]
    fn transcode_request_carries_parameters() {
        let tracks = vec![TrackInfo::new(0, TrackType::Video, "h264").with_dimensions(3840, 2160)];
        let mut video = VideoTranscodeConfig::new(VideoCodec::Hevc);
        video.scaling = Some(ScalingSettings {
            max_resolution: Some("1080p".to_string()),
            ..ScalingSettings::default()
        });
        video.hardware_acceleration.enabled = HardwareAccelMode::Nvenc;
        let config = TranscodeConfig {
            video: Some(video),
            audio: None,
        };
        let plan = TranscodeDecisionEngine::new(&tracks, SkipFlags::default()).plan(&config);
        let request = plan.video_request().unwrap();
        assert_eq!(request.quality.crf, Some(28));
        assert_eq!(
            request.scale,
            Some(ScaleTarget {
                width: 1920,
                height: 1080,
                algorithm: ScaleAlgorithm::Lanczos
            })
        );
        assert_eq!(request.hardware, HardwareAccelMode::Nvenc);
    }

    #[test]
    fn already_target_codec_is_untouched() {
        let tracks = vec![TrackInfo::new(0, TrackType::Video, "h265").with_dimensions(1920, 1080)];
        let config = TranscodeConfig {
            video: Some(VideoTranscodeConfig::new(VideoCodec::Hevc)),
            audio: Some(AudioTranscodeConfig::default()),
        };
        let plan = TranscodeDecisionEngine::new(&tracks, SkipFlags::default()).plan(&config);
        assert!(plan.is_noop());
    }

    #[test]
    fn skip_flag_suppresses_video() {
        let tracks = vec![TrackInfo::new(0, TrackType::Video, "mpeg2video")];
        let config = TranscodeConfig {
            video: Some(VideoTranscodeConfig::new(VideoCodec::H264)),
            audio: None,
        };
        let flags = SkipFlags::default().with(SkipType::VideoTranscode);
        let plan = TranscodeDecisionEngine::new(&tracks, flags).plan(&config);
        assert!(plan.is_noop());
    }

    #[test]
    fn audio_preserve_and_transcode() {
        let tracks = tracks();
        let config = TranscodeConfig {
            video: None,
            audio: Some(AudioTranscodeConfig {
                preserve_codecs: vec!["truehd".to_string()],
                transcode_to: "aac".to_string(),
                bitrate: "256k".to_string(),
            }),
        };
        let plan = TranscodeDecisionEngine::new(&tracks, SkipFlags::default()).plan(&config);
        let transcoded: Vec<usize> = plan.audio_requests().map(|d| d.track_index).collect();
        assert_eq!(transcoded, vec![2]);
        assert_eq!(
            plan.audio[1].action,
            AudioAction::Transcode {
                codec: "aac".to_string(),
                bitrate: Some(256_000)
            }
        );

        let flags = SkipFlags::default().with(SkipType::AudioTranscode);
        let plan = TranscodeDecisionEngine::new(&tracks, flags).plan(&config);
        assert_eq!(plan.request_count(), 0);
    }

    #[test]
    fn scaling_preserves_aspect_and_parity() {
        assert_eq!(scaled_dimensions(1920, 800, (1280, 720), false), Some((1280, 534)));
        assert_eq!(scaled_dimensions(1280, 720, (1920, 1080), false), None);
        assert_eq!(scaled_dimensions(1280, 720, (1920, 1080), true), Some((1920, 1080)));
    }
}
