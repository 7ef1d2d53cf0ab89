//! Keep/remove decisions for every track of a file.

use tracing::debug;

use crate::models::{language_in, TrackInfo, TrackType};
use crate::policy::PolicyResult;

use super::fallback::apply_audio_fallback;
use super::types::{
    AttachmentFilterConfig, AudioFilterConfig, DispositionPlan, SubtitleFilterConfig,
    TrackDisposition,
};

/// Computes one disposition per track from the configured filters.
///
/// Filters that are not configured keep every track of their type.
/// The engine never touches the file.
#[derive(Debug, Clone, Copy, Default)]
pub struct TrackDispositionEngine<'a> {
    audio: Option<&'a AudioFilterConfig>,
    subtitle: Option<&'a SubtitleFilterConfig>,
    attachment: Option<&'a AttachmentFilterConfig>,
}

impl<'a> TrackDispositionEngine<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_audio(mut self, config: &'a AudioFilterConfig) -> Self {
        self.audio = Some(config);
        self
    }

    pub fn with_subtitle(mut self, config: &'a SubtitleFilterConfig) -> Self {
        self.subtitle = Some(config);
        self
    }

    pub fn with_attachment(mut self, config: &'a AttachmentFilterConfig) -> Self {
        self.attachment = Some(config);
        self
    }

    /// Compute dispositions in track order.
    pub fn compute(&self, tracks: &[TrackInfo]) -> PolicyResult<DispositionPlan> {
        let mut dispositions: Vec<TrackDisposition> =
            tracks.iter().map(|t| self.initial_disposition(t)).collect();

        if let Some(audio) = self.audio {
            let audio_total = tracks
                .iter()
                .filter(|t| t.track_type == TrackType::Audio)
                .count();
            let audio_kept = dispositions
                .iter()
                .filter(|d| d.track_type == TrackType::Audio && d.is_keep())
                .count();
            if audio_total > 0 && audio_kept < audio.minimum {
                apply_audio_fallback(tracks, &mut dispositions, audio)?;
            }
        }

        let mut warnings = Vec::new();
        let attachments_removed = dispositions
            .iter()
            .filter(|d| d.track_type == TrackType::Attachment && !d.is_keep())
            .count();
        let subtitles_kept = dispositions
            .iter()
            .filter(|d| d.track_type == TrackType::Subtitle && d.is_keep())
            .count();
        if attachments_removed > 0 && subtitles_kept > 0 {
            warnings.push(format!(
                "Removing {} attachment(s) while {} subtitle track(s) are kept; \
                 styled subtitles may render without their fonts",
                attachments_removed, subtitles_kept
            ));
        }

        let plan = DispositionPlan {
            dispositions,
            warnings,
        };
        debug!(
            kept = plan.kept().count(),
            removed = plan.removed().count(),
            "Computed track dispositions"
        );
        Ok(plan)
    }

    fn initial_disposition(&self, track: &TrackInfo) -> TrackDisposition {
        let index = track.index;
        let kind = track.track_type;
        match kind {
            TrackType::Video => TrackDisposition::keep(index, kind, "video track"),
            TrackType::Audio => match self.audio {
                Some(cfg) if language_in(&track.language, &cfg.languages) => {
                    TrackDisposition::keep(index, kind, "language in keep list")
                }
                Some(_) => TrackDisposition::remove(index, kind, "language not in keep list"),
                None => TrackDisposition::keep(index, kind, "no language filter applied"),
            },
            TrackType::Subtitle => match self.subtitle {
                Some(cfg) if cfg.remove_all => {
                    TrackDisposition::remove(index, kind, "remove_all enabled")
                }
                Some(cfg) if cfg.preserve_forced && track.is_forced => {
                    TrackDisposition::keep(index, kind, "forced subtitle preserved")
                }
                Some(SubtitleFilterConfig {
                    languages: Some(languages),
                    ..
                }) => {
                    if language_in(&track.language, languages) {
                        TrackDisposition::keep(index, kind, "language in keep list")
                    } else {
                        TrackDisposition::remove(index, kind, "language not in keep list")
                    }
                }
                _ => TrackDisposition::keep(index, kind, "no language filter applied"),
            },
            TrackType::Attachment => match self.attachment {
                Some(cfg) if cfg.remove_all => {
                    TrackDisposition::remove(index, kind, "remove_all enabled")
                }
                _ => TrackDisposition::keep(index, kind, "no attachment filter applied"),
            },
            TrackType::Other => TrackDisposition::keep(index, kind, "no filter applies"),
        }
    }
}
