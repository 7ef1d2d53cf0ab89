//! Transcode configuration and decision types.

use serde::{Deserialize, Serialize};

/// Video codecs a transcode can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    Hevc,
    Vp9,
    Av1,
}

impl VideoCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoCodec::H264 => "h264",
            VideoCodec::Hevc => "hevc",
            VideoCodec::Vp9 => "vp9",
            VideoCodec::Av1 => "av1",
        }
    }
}

impl std::fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityMode {
    #[default]
    Crf,
    Bitrate,
    /// CRF capped by `max_bitrate`.
    ConstrainedQuality,
}

fn default_preset() -> String {
    "medium".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QualitySettings {
    #[serde(default)]
    pub mode: QualityMode,
    /// 0-51; codec default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crf: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_bitrate: Option<String>,
    #[serde(default = "default_preset")]
    pub preset: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tune: Option<String>,
    #[serde(default)]
    pub two_pass: bool,
}

impl Default for QualitySettings {
    fn default() -> Self {
        Self {
            mode: QualityMode::default(),
            crf: None,
            bitrate: None,
            max_bitrate: None,
            preset: default_preset(),
            tune: None,
            two_pass: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScaleAlgorithm {
    #[default]
    Lanczos,
    Bicubic,
    Bilinear,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScalingSettings {
    /// Resolution preset such as "1080p" or "4k".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_resolution: Option<String>,
    #[serde(default)]
    pub algorithm: ScaleAlgorithm,
    #[serde(default)]
    pub upscale: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareAccelMode {
    #[default]
    Auto,
    Nvenc,
    Qsv,
    Vaapi,
    None,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareAccelConfig {
    #[serde(default)]
    pub enabled: HardwareAccelMode,
    #[serde(default = "default_true")]
    pub fallback_to_cpu: bool,
}

impl Default for HardwareAccelConfig {
    fn default() -> Self {
        Self {
            enabled: HardwareAccelMode::Auto,
            fallback_to_cpu: true,
        }
    }
}

/// Conditions under which the video track is already acceptable.
///
/// Every condition that is set must hold. Unknown track properties never
/// block a skip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoSkipCondition {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec_matches: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_within: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bitrate_under: Option<String>,
}

impl VideoSkipCondition {
    pub fn is_empty(&self) -> bool {
        self.codec_matches.is_none()
            && self.resolution_within.is_none()
            && self.bitrate_under.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VideoTranscodeConfig {
    pub target_codec: VideoCodec,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skip_if: Option<VideoSkipCondition>,
    #[serde(default)]
    pub quality: QualitySettings,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scaling: Option<ScalingSettings>,
    #[serde(default)]
    pub hardware_acceleration: HardwareAccelConfig,
}

impl VideoTranscodeConfig {
    pub fn new(target_codec: VideoCodec) -> Self {
        Self {
            target_codec,
            skip_if: None,
            quality: QualitySettings::default(),
            scaling: None,
            hardware_acceleration: HardwareAccelConfig::default(),
        }
    }
}

fn default_preserve_codecs() -> Vec<String> {
    ["truehd", "dts-hd", "flac", "pcm_s24le"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_audio_codec() -> String {
    "aac".to_string()
}

fn default_audio_bitrate() -> String {
    "192k".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioTranscodeConfig {
    #[serde(default = "default_preserve_codecs")]
    pub preserve_codecs: Vec<String>,
    #[serde(default = "default_audio_codec")]
    pub transcode_to: String,
    #[serde(default = "default_audio_bitrate")]
    pub bitrate: String,
}

impl Default for AudioTranscodeConfig {
    fn default() -> Self {
        Self {
            preserve_codecs: default_preserve_codecs(),
            transcode_to: default_audio_codec(),
            bitrate: default_audio_bitrate(),
        }
    }
}

/// Transcode operation config: video, audio, or both.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscodeConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoTranscodeConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTranscodeConfig>,
}

/// Output dimensions after scaling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScaleTarget {
    pub width: u32,
    pub height: u32,
    pub algorithm: ScaleAlgorithm,
}

/// Encoder parameters resolved from the quality settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedQuality {
    pub mode: QualityMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crf: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bitrate: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_bitrate: Option<u64>,
    pub preset: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tune: Option<String>,
    pub two_pass: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VideoTranscodeRequest {
    pub track_index: usize,
    pub source_codec: String,
    pub target_codec: VideoCodec,
    pub quality: ResolvedQuality,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<ScaleTarget>,
    pub hardware: HardwareAccelMode,
    pub fallback_to_cpu: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum VideoDecision {
    Skipped { track_index: usize, reason: String },
    Transcode(VideoTranscodeRequest),
}

impl VideoDecision {
    pub fn request(&self) -> Option<&VideoTranscodeRequest> {
        match self {
            VideoDecision::Transcode(request) => Some(request),
            VideoDecision::Skipped { .. } => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AudioAction {
    Passthrough { reason: String },
    Transcode { codec: String, bitrate: Option<u64> },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioDecision {
    pub track_index: usize,
    pub source_codec: String,
    #[serde(flatten)]
    pub action: AudioAction,
}

impl AudioDecision {
    pub fn is_transcode(&self) -> bool {
        matches!(self.action, AudioAction::Transcode { .. })
    }
}

/// One decision per video/audio track. Nothing is encoded here.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranscodePlan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video: Option<VideoDecision>,
    pub audio: Vec<AudioDecision>,
}

impl TranscodePlan {
    pub fn video_request(&self) -> Option<&VideoTranscodeRequest> {
        self.video.as_ref().and_then(VideoDecision::request)
    }

    pub fn audio_requests(&self) -> impl Iterator<Item = &AudioDecision> {
        self.audio.iter().filter(|d| d.is_transcode())
    }

    /// Number of encoder invocations the plan asks for.
    pub fn request_count(&self) -> usize {
        usize::from(self.video_request().is_some()) + self.audio_requests().count()
    }

    pub fn is_noop(&self) -> bool {
        self.request_count() == 0
    }
}
