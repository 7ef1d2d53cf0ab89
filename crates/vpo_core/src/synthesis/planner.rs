//! Planning of synthesized audio tracks.

use tracing::{debug, warn};

use crate::conditions::{evaluate_with_reason, EvaluationFacts};
use crate::models::{codec_in, language_in, TrackInfo, TrackType};
use crate::transcode::parse_bitrate;

use super::source::{channels_match, select_source};
use super::types::{
    AudioSynthesisConfig, Downmix, Inherited, SkipIfExists, SkippedSynthesis, SynthesisCodec,
    SynthesisOperation, SynthesisPlan, SynthesisRule, SynthesisSkipReason, TrackPosition,
};

/// Default bitrate for a codec and channel count, in bits per second.
///
/// Channel counts without an entry use the nearest larger entry, or the
/// largest one. Lossless codecs have no bitrate.
pub fn default_bitrate(codec: SynthesisCodec, channels: u32) -> Option<u64> {
    let table: &[(u32, u64)] = match codec {
        SynthesisCodec::Eac3 => &[(2, 384_000), (6, 640_000), (8, 768_000)],
        SynthesisCodec::Aac => &[(2, 192_000), (6, 384_000), (8, 512_000)],
        SynthesisCodec::Ac3 => &[(2, 192_000), (6, 448_000)],
        SynthesisCodec::Opus => &[(2, 128_000), (6, 256_000), (8, 384_000)],
        SynthesisCodec::Flac => return None,
    };
    table
        .iter()
        .find(|(ch, _)| *ch >= channels)
        .or_else(|| table.last())
        .map(|(_, rate)| *rate)
}

/// Produces new-track descriptors without invoking any encoder.
pub struct AudioSynthesisPlanner<'a> {
    facts: EvaluationFacts<'a>,
}

impl<'a> AudioSynthesisPlanner<'a> {
    pub fn new(facts: EvaluationFacts<'a>) -> Self {
        Self { facts }
    }

    pub fn plan(&self, config: &AudioSynthesisConfig) -> SynthesisPlan {
        let mut plan = SynthesisPlan::default();
        for rule in &config.tracks {
            match self.plan_rule(rule, plan.operations.len()) {
                Ok(op) => {
                    debug!(
                        rule = %rule.name,
                        source = op.source_track_index,
                        "Planned synthesized track"
                    );
                    plan.operations.push(op);
                }
                Err(skipped) => {
                    debug!(
                        rule = %rule.name,
                        reason = ?skipped.reason,
                        details = %skipped.details,
                        "Synthesis skipped"
                    );
                    plan.skipped.push(skipped);
                }
            }
        }
        plan
    }

    fn plan_rule(
        &self,
        rule: &SynthesisRule,
        planned_before: usize,
    ) -> Result<SynthesisOperation, SkippedSynthesis> {
        let skip = |reason, details: String| SkippedSynthesis {
            rule_name: rule.name.clone(),
            reason,
            details,
        };

        if let Some(condition) = &rule.create_if {
            let (create, reason) = evaluate_with_reason(condition, &self.facts);
            if !create {
                return Err(skip(
                    SynthesisSkipReason::ConditionNotMet,
                    format!("create_if not satisfied: {}", reason),
                ));
            }
        }

        let audio: Vec<&TrackInfo> = self
            .facts
            .tracks
            .iter()
            .filter(|t| t.track_type == TrackType::Audio)
            .collect();

        if let Some(criteria) = &rule.skip_if_exists {
            if let Some(existing) = self.find_existing(criteria, &audio) {
                return Err(skip(
                    SynthesisSkipReason::AlreadyExists,
                    format!("{} satisfies skip_if_exists", existing.describe()),
                ));
            }
        }

        let Some(source) = select_source(&audio, &rule.prefer, self.facts.commentary) else {
            return Err(skip(
                SynthesisSkipReason::NoSourceAvailable,
                "no audio tracks available".to_string(),
            ));
        };

        let source_channels = source.channels.unwrap_or(2);
        let target_channels = rule.channels.channels();
        if target_channels > source_channels {
            return Err(skip(
                SynthesisSkipReason::WouldUpmix,
                format!(
                    "source {} has {} channels, target needs {}",
                    source.describe(),
                    source_channels,
                    target_channels
                ),
            ));
        }

        let downmix = (source_channels != target_channels).then_some(Downmix {
            from_channels: source_channels,
            to_channels: target_channels,
        });

        let bitrate = match rule.bitrate.as_deref().map(parse_bitrate) {
            Some(Some(rate)) => Some(rate),
            Some(None) => {
                warn!(rule = %rule.name, "Unparseable bitrate, using codec default");
                default_bitrate(rule.codec, target_channels)
            }
            None => default_bitrate(rule.codec, target_channels),
        };

        let title = match &rule.title {
            Inherited::Inherit => source.title.clone(),
            Inherited::Value(title) => Some(title.clone()),
        };
        let language = match &rule.language {
            Inherited::Inherit => source.language.clone(),
            Inherited::Value(language) => language.clone(),
        };

        Ok(SynthesisOperation {
            rule_name: rule.name.clone(),
            source_track_index: source.index,
            codec: rule.codec,
            channels: target_channels,
            bitrate,
            title,
            language,
            audio_position: resolve_position(rule.position, source.index, &audio, planned_before),
            downmix,
        })
    }

    fn find_existing<'t>(
        &self,
        criteria: &SkipIfExists,
        audio: &[&'t TrackInfo],
    ) -> Option<&'t TrackInfo> {
        audio.iter().copied().find(|track| {
            criteria
                .codec
                .as_ref()
                .is_none_or(|codecs| codec_in(&track.codec, codecs))
                && criteria
                    .channels
                    .as_ref()
                    .is_none_or(|ch| channels_match(track, ch, audio))
                && criteria
                    .language
                    .as_ref()
                    .is_none_or(|langs| language_in(&track.language, langs))
                && !(criteria.not_commentary && self.facts.commentary.is_commentary(track))
        })
    }
}

/// 0-based audio slot for a new track.
fn resolve_position(
    position: TrackPosition,
    source_index: usize,
    audio: &[&TrackInfo],
    planned_before: usize,
) -> usize {
    let end = audio.len() + planned_before;
    match position {
        TrackPosition::Index(n) => n.saturating_sub(1).min(end),
        TrackPosition::AfterSource => audio
            .iter()
            .position(|t| t.index == source_index)
            .map(|i| i + 1 + planned_before)
            .unwrap_or(end),
        TrackPosition::End => end,
    }
}
