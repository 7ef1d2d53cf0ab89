//! Runners for each operation kind.
//!
//! A runner reads the current projected state, asks the matching engine for
//! a decision, hands any file change to the tool runner and then projects
//! the change so the next operation sees it.

use std::path::Path;

use tracing::debug;

use crate::actions::{ActionExecutor, ConditionalRule};
use crate::conditions::EvaluationFacts;
use crate::disposition::TrackDispositionEngine;
use crate::language::{
    sample_positions, MultiLanguageAggregator, MultiLanguageDetectionResult, MultiSampleConfig,
    PluginFeature, SampleDetection, TranscriptionError,
};
use crate::logging::JobLogger;
use crate::models::{
    language_in, languages_match, CommentaryMatcher, FileInfo, FlagType, TrackFlagChange,
    TrackInfo, TrackType,
};
use crate::policy::{
    DefaultFlagsConfig, GlobalConfig, Operation, TrackCategory, TrackOrderConfig,
    TranscriptionConfig,
};
use crate::synthesis::{AudioSynthesisConfig, AudioSynthesisPlanner, SynthesisOperation};
use crate::transcode::{
    plan_container, AudioAction, ContainerConfig, ContainerTrackAction, TranscodeConfig,
    TranscodeDecisionEngine, VideoDecision,
};

use super::collaborators::{Collaborators, ExtractRequest, RemuxRequest, TranscodeRequest};
use super::errors::OperationResult;
use super::projection::{project, TrackEdit};
use super::types::ExecutionState;

/// Read-only inputs shared by every operation of one file.
pub(crate) struct OperationContext<'a> {
    pub path: &'a Path,
    pub config: &'a GlobalConfig,
    pub commentary: &'a CommentaryMatcher,
    pub collaborators: &'a Collaborators,
    pub sample_config: &'a MultiSampleConfig,
    pub logger: &'a JobLogger,
}

#[derive(Debug, Default)]
pub(crate) struct OperationOutput {
    pub change_count: usize,
    pub warnings: Vec<String>,
    /// The file on disk was modified.
    pub mutated: bool,
}

impl OperationOutput {
    fn unchanged() -> Self {
        Self::default()
    }

    fn changed(change_count: usize) -> Self {
        Self {
            change_count,
            warnings: Vec::new(),
            mutated: true,
        }
    }

    fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings.extend(warnings);
        self
    }
}

pub(crate) fn run_operation(
    operation: &Operation,
    ctx: &OperationContext<'_>,
    state: &mut ExecutionState,
) -> OperationResult<OperationOutput> {
    match operation {
        Operation::Container(config) => run_container(config, ctx, state),
        Operation::AudioFilter(config) => {
            run_filter(TrackDispositionEngine::new().with_audio(config), ctx, state)
        }
        Operation::SubtitleFilter(config) => {
            run_filter(TrackDispositionEngine::new().with_subtitle(config), ctx, state)
        }
        Operation::AttachmentFilter(config) => {
            run_filter(TrackDispositionEngine::new().with_attachment(config), ctx, state)
        }
        Operation::TrackOrder(config) => run_track_order(config, ctx, state),
        Operation::DefaultFlags(config) => run_default_flags(config, ctx, state),
        Operation::Conditional(rules) => run_conditional(rules, ctx, state),
        Operation::AudioSynthesis(config) => run_synthesis(config, ctx, state),
        Operation::Transcode(config) => run_transcode(config, ctx, state),
        Operation::Transcription(config) => run_transcription(config, ctx, state),
    }
}

fn remux(
    ctx: &OperationContext<'_>,
    state: &mut ExecutionState,
    request: RemuxRequest,
) -> OperationResult<()> {
    ctx.logger.command(&request.describe());
    ctx.collaborators.tools.remux(&request)?;
    project(state, &request.edits);
    if let Some(target) = request.target_container {
        state.file_info.container_format = target.as_str().to_string();
    }
    Ok(())
}

fn run_container(
    config: &ContainerConfig,
    ctx: &OperationContext<'_>,
    state: &mut ExecutionState,
) -> OperationResult<OperationOutput> {
    let plan = plan_container(&state.file_info, config)?;
    if let Some(reason) = &plan.skipped {
        ctx.logger.warn(reason);
        return Ok(OperationOutput::unchanged().with_warnings(vec![reason.clone()]));
    }
    if plan.is_noop() {
        ctx.logger.info(&format!("Already {}, nothing to convert", plan.target));
        return Ok(OperationOutput::unchanged());
    }

    let edits = plan
        .track_actions
        .iter()
        .map(|action| match action {
            ContainerTrackAction::ConvertSubtitle { track_index, to }
            | ContainerTrackAction::TranscodeAudio { track_index, to } => TrackEdit::ConvertCodec {
                track_index: *track_index,
                codec: to.clone(),
            },
            ContainerTrackAction::Remove { track_index, .. } => TrackEdit::Remove {
                track_index: *track_index,
            },
        })
        .collect();
    let mut request = RemuxRequest::new(ctx.path, edits);
    if plan.convert {
        request.target_container = Some(plan.target);
    }

    remux(ctx, state, request)?;
    Ok(OperationOutput::changed(
        plan.track_actions.len() + usize::from(plan.convert),
    ))
}

fn run_filter(
    engine: TrackDispositionEngine<'_>,
    ctx: &OperationContext<'_>,
    state: &mut ExecutionState,
) -> OperationResult<OperationOutput> {
    if state.skip_flags.skip_track_filter {
        ctx.logger.info("Track filter skipped by conditional rule");
        return Ok(OperationOutput::unchanged());
    }

    let plan = engine.compute(&state.file_info.tracks)?;
    for warning in &plan.warnings {
        ctx.logger.warn(warning);
    }
    for disposition in plan.removed() {
        ctx.logger.debug(&format!(
            "Track {} ({}) removed: {}",
            disposition.track_index, disposition.track_type, disposition.reason
        ));
    }

    let removed = plan.removed_indices();
    if removed.is_empty() {
        return Ok(OperationOutput::unchanged().with_warnings(plan.warnings));
    }

    let edits = removed
        .iter()
        .map(|&track_index| TrackEdit::Remove { track_index })
        .collect();
    remux(ctx, state, RemuxRequest::new(ctx.path, edits))?;
    Ok(OperationOutput::changed(removed.len()).with_warnings(plan.warnings))
}

/// Ordering category of a track; `None` for tracks no category covers.
pub(crate) fn track_category(
    track: &TrackInfo,
    config: &GlobalConfig,
    commentary: &CommentaryMatcher,
) -> Option<TrackCategory> {
    match track.track_type {
        TrackType::Video => Some(TrackCategory::Video),
        TrackType::Audio if commentary.is_commentary(track) => Some(TrackCategory::AudioCommentary),
        TrackType::Audio if language_in(&track.language, &config.audio_languages) => {
            Some(TrackCategory::AudioMain)
        }
        TrackType::Audio => Some(TrackCategory::AudioAlternate),
        TrackType::Subtitle if commentary.is_commentary(track) => {
            Some(TrackCategory::SubtitleCommentary)
        }
        TrackType::Subtitle if track.is_forced => Some(TrackCategory::SubtitleForced),
        TrackType::Subtitle => Some(TrackCategory::SubtitleMain),
        TrackType::Attachment => Some(TrackCategory::Attachment),
        TrackType::Other => None,
    }
}

/// New order of track indices. Stable within a category; uncategorized and
/// unlisted tracks go last.
pub(crate) fn plan_track_order(
    tracks: &[TrackInfo],
    order: &[TrackCategory],
    config: &GlobalConfig,
    commentary: &CommentaryMatcher,
) -> Vec<usize> {
    let mut ranked: Vec<(usize, usize)> = tracks
        .iter()
        .map(|track| {
            let rank = track_category(track, config, commentary)
                .and_then(|c| order.iter().position(|o| *o == c))
                .unwrap_or(order.len());
            (rank, track.index)
        })
        .collect();
    ranked.sort_by_key(|(rank, _)| *rank);
    ranked.into_iter().map(|(_, index)| index).collect()
}

fn run_track_order(
    config: &TrackOrderConfig,
    ctx: &OperationContext<'_>,
    state: &mut ExecutionState,
) -> OperationResult<OperationOutput> {
    let tracks = &state.file_info.tracks;
    let order = plan_track_order(tracks, &config.order, ctx.config, ctx.commentary);
    let moved = order
        .iter()
        .zip(tracks)
        .filter(|(index, track)| **index != track.index)
        .count();
    if moved == 0 {
        return Ok(OperationOutput::unchanged());
    }

    remux(
        ctx,
        state,
        RemuxRequest::new(ctx.path, vec![TrackEdit::Reorder { order }]),
    )?;
    Ok(OperationOutput::changed(moved))
}

fn preferred_track<'t>(
    file: &'t FileInfo,
    track_type: TrackType,
    languages: &[String],
    commentary: &CommentaryMatcher,
) -> Option<&'t TrackInfo> {
    let candidates = || {
        file.tracks_of(track_type)
            .filter(|t| !commentary.is_commentary(t))
    };
    languages
        .iter()
        .find_map(|lang| candidates().find(|t| languages_match(&t.language, lang)))
        .or_else(|| candidates().next())
        .or_else(|| file.tracks_of(track_type).next())
}

fn default_changes_for(
    file: &FileInfo,
    track_type: TrackType,
    preferred: Option<usize>,
    clear_others: bool,
    changes: &mut Vec<TrackFlagChange>,
) {
    for track in file.tracks_of(track_type) {
        let wanted = if Some(track.index) == preferred {
            true
        } else if clear_others {
            false
        } else {
            track.is_default
        };
        if wanted != track.is_default {
            changes.push(TrackFlagChange {
                track_index: track.index,
                flag: FlagType::Default,
                value: wanted,
            });
        }
    }
}

/// Default-flag changes needed; flags that already match are left out.
pub(crate) fn plan_default_flags(
    file: &FileInfo,
    flags: &DefaultFlagsConfig,
    config: &GlobalConfig,
    commentary: &CommentaryMatcher,
) -> Vec<TrackFlagChange> {
    let mut changes = Vec::new();
    let clear = flags.clear_other_defaults;

    if flags.set_first_video_default {
        let first = file.video_track().map(|t| t.index);
        default_changes_for(file, TrackType::Video, first, clear, &mut changes);
    }
    if flags.set_preferred_audio_default {
        let preferred =
            preferred_track(file, TrackType::Audio, &config.audio_languages, commentary)
                .map(|t| t.index);
        default_changes_for(file, TrackType::Audio, preferred, clear, &mut changes);
    }
    if flags.set_preferred_subtitle_default {
        let preferred = preferred_track(
            file,
            TrackType::Subtitle,
            &config.subtitle_languages,
            commentary,
        )
        .map(|t| t.index);
        default_changes_for(file, TrackType::Subtitle, preferred, clear, &mut changes);
    }

    changes.sort_by_key(|c| c.track_index);
    changes
}

fn flag_edits(file: &FileInfo, changes: &[TrackFlagChange]) -> Vec<TrackEdit> {
    changes
        .iter()
        .filter(|change| {
            file.track(change.track_index).is_some_and(|t| match change.flag {
                FlagType::Default => t.is_default != change.value,
                FlagType::Forced => t.is_forced != change.value,
            })
        })
        .map(|change| TrackEdit::SetFlag {
            track_index: change.track_index,
            flag: change.flag,
            value: change.value,
        })
        .collect()
}

fn run_default_flags(
    flags: &DefaultFlagsConfig,
    ctx: &OperationContext<'_>,
    state: &mut ExecutionState,
) -> OperationResult<OperationOutput> {
    let changes = plan_default_flags(&state.file_info, flags, ctx.config, ctx.commentary);
    if changes.is_empty() {
        return Ok(OperationOutput::unchanged());
    }
    let edits = flag_edits(&state.file_info, &changes);
    remux(ctx, state, RemuxRequest::new(ctx.path, edits))?;
    Ok(OperationOutput::changed(changes.len()))
}

fn run_conditional(
    rules: &[ConditionalRule],
    ctx: &OperationContext<'_>,
    state: &mut ExecutionState,
) -> OperationResult<OperationOutput> {
    let outcome = {
        let facts = EvaluationFacts::new(
            &state.file_info.tracks,
            &state.language_results,
            ctx.commentary,
        );
        ActionExecutor::new(facts).run_rules(rules, ctx.path, state.skip_flags)?
    };

    for evaluation in &outcome.evaluations {
        ctx.logger.debug(&format!(
            "Rule '{}' {}: {}",
            evaluation.rule_name,
            if evaluation.matched { "matched" } else { "did not match" },
            evaluation.reason
        ));
    }
    for warning in &outcome.warnings {
        ctx.logger.warn(warning);
    }
    if outcome.skip_flags != state.skip_flags {
        ctx.logger.info(&format!("Skip flags now {:?}", outcome.skip_flags));
    }
    state.skip_flags = outcome.skip_flags;

    let edits = flag_edits(&state.file_info, &outcome.flag_changes);
    if edits.is_empty() {
        return Ok(OperationOutput::unchanged().with_warnings(outcome.warnings));
    }
    let count = edits.len();
    remux(ctx, state, RemuxRequest::new(ctx.path, edits))?;
    Ok(OperationOutput::changed(count).with_warnings(outcome.warnings))
}

pub(crate) fn synthesized_track(operation: &SynthesisOperation) -> TrackInfo {
    let mut track = TrackInfo::new(0, TrackType::Audio, operation.codec.as_str())
        .with_language(operation.language.clone())
        .with_channels(operation.channels);
    if let Some(title) = &operation.title {
        track = track.with_title(title.clone());
    }
    if let Some(bitrate) = operation.bitrate {
        track = track.with_bitrate(bitrate);
    }
    track
}

fn run_synthesis(
    config: &AudioSynthesisConfig,
    ctx: &OperationContext<'_>,
    state: &mut ExecutionState,
) -> OperationResult<OperationOutput> {
    let plan = {
        let facts = EvaluationFacts::new(
            &state.file_info.tracks,
            &state.language_results,
            ctx.commentary,
        );
        AudioSynthesisPlanner::new(facts).plan(config)
    };

    for skipped in &plan.skipped {
        ctx.logger.info(&format!(
            "Synthesis '{}' skipped ({:?}): {}",
            skipped.rule_name, skipped.reason, skipped.details
        ));
    }
    if plan.is_noop() {
        return Ok(OperationOutput::unchanged());
    }

    let mut request = TranscodeRequest::new(ctx.path);
    request.synthesis = plan.operations.clone();
    ctx.logger.command(&request.describe());
    ctx.collaborators.tools.transcode(&request)?;

    let edits: Vec<TrackEdit> = plan
        .operations
        .iter()
        .map(|operation| TrackEdit::Insert {
            audio_position: operation.audio_position,
            track: synthesized_track(operation),
        })
        .collect();
    project(state, &edits);
    Ok(OperationOutput::changed(plan.operations.len()))
}

fn run_transcode(
    config: &TranscodeConfig,
    ctx: &OperationContext<'_>,
    state: &mut ExecutionState,
) -> OperationResult<OperationOutput> {
    let plan = TranscodeDecisionEngine::new(&state.file_info.tracks, state.skip_flags).plan(config);

    if let Some(VideoDecision::Skipped {
        track_index,
        reason,
    }) = &plan.video
    {
        ctx.logger
            .info(&format!("Video track {} not transcoded: {}", track_index, reason));
    }
    if plan.is_noop() {
        return Ok(OperationOutput::unchanged());
    }

    let mut request = TranscodeRequest::new(ctx.path);
    request.video = plan.video_request().cloned();
    request.audio = plan.audio_requests().cloned().collect();

    let mut edits = Vec::new();
    if let Some(video) = &request.video {
        edits.push(TrackEdit::ConvertCodec {
            track_index: video.track_index,
            codec: video.target_codec.as_str().to_string(),
        });
        if let Some(scale) = video.scale {
            edits.push(TrackEdit::Resize {
                track_index: video.track_index,
                width: scale.width,
                height: scale.height,
            });
        }
    }
    for audio in &request.audio {
        if let AudioAction::Transcode { codec, .. } = &audio.action {
            edits.push(TrackEdit::ConvertCodec {
                track_index: audio.track_index,
                codec: codec.clone(),
            });
        }
    }

    ctx.logger.command(&request.describe());
    ctx.collaborators.tools.transcode(&request)?;
    project(state, &edits);
    Ok(OperationOutput::changed(plan.request_count()))
}

/// Per-sample detections behind an aggregated result, one per speech segment.
fn segment_detections(result: &MultiLanguageDetectionResult) -> Vec<SampleDetection> {
    result
        .segments
        .iter()
        .map(|segment| SampleDetection {
            language: Some(segment.language_code.clone()),
            confidence: segment.confidence,
            has_speech: true,
        })
        .collect()
}

fn run_transcription(
    config: &TranscriptionConfig,
    ctx: &OperationContext<'_>,
    state: &mut ExecutionState,
) -> OperationResult<OperationOutput> {
    let plugin = match &ctx.collaborators.transcriber {
        Some(plugin)
            if plugin.supports(PluginFeature::MultiLanguageDetection)
                || plugin.supports(PluginFeature::LanguageDetection) =>
        {
            plugin
        }
        Some(plugin) => {
            let warning = format!(
                "Transcription plugin '{}' cannot detect languages; transcription skipped",
                plugin.name()
            );
            ctx.logger.warn(&warning);
            return Ok(OperationOutput::unchanged().with_warnings(vec![warning]));
        }
        None => {
            let warning = "No transcription plugin configured; transcription skipped".to_string();
            ctx.logger.warn(&warning);
            return Ok(OperationOutput::unchanged().with_warnings(vec![warning]));
        }
    };

    let audio: Vec<(usize, Option<f64>, String)> = state
        .file_info
        .tracks_of(TrackType::Audio)
        .map(|t| (t.index, t.duration_seconds, t.language.clone()))
        .collect();

    let mut warnings = Vec::new();
    let mut edits = Vec::new();
    for (track_index, duration, language) in audio {
        let mut samples = Vec::new();
        for start_time in sample_positions(duration, ctx.sample_config) {
            let request = ExtractRequest {
                path: ctx.path.to_path_buf(),
                track_index,
                start_time,
                duration: ctx.sample_config.sample_duration,
            };
            samples.push(ctx.collaborators.tools.extract(&request)?);
        }

        let result = match plugin.detect_multi_language(&samples) {
            Ok(result) => result,
            Err(TranscriptionError::NoSpeechDetected { .. }) => {
                let warning = format!("No speech detected in audio track {}", track_index);
                ctx.logger.warn(&warning);
                warnings.push(warning);
                continue;
            }
            Err(e) => return Err(e.into()),
        };

        ctx.logger.info(&format!(
            "Audio track {}: {} ({}, {:.0}% primary)",
            track_index,
            result.primary_language,
            result.classification,
            result.primary_percentage * 100.0
        ));
        debug!(track_index, samples = samples.len(), "Language detection finished");

        if config.update_language {
            let vote = MultiLanguageAggregator.vote(
                &segment_detections(&result),
                Some(&language),
                ctx.sample_config.incumbent_bonus,
            );
            if let Some(vote) = vote {
                debug!(
                    track_index,
                    winner = %vote.language,
                    confidence = vote.confidence,
                    "Language vote"
                );
                if vote.confidence >= config.confidence_threshold
                    && !languages_match(&language, &vote.language)
                {
                    edits.push(TrackEdit::SetLanguage {
                        track_index,
                        language: vote.language,
                    });
                }
            }
        }
        state.language_results.insert(track_index, result);
    }

    if edits.is_empty() {
        return Ok(OperationOutput::unchanged().with_warnings(warnings));
    }
    let count = edits.len();
    remux(ctx, state, RemuxRequest::new(ctx.path, edits))?;
    Ok(OperationOutput::changed(count).with_warnings(warnings))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> GlobalConfig {
        GlobalConfig {
            audio_languages: vec!["eng".into()],
            subtitle_languages: vec!["eng".into()],
            ..GlobalConfig::default()
        }
    }

    fn file() -> FileInfo {
        FileInfo::new(
            "mkv",
            vec![
                TrackInfo::new(0, TrackType::Subtitle, "subrip").with_language("eng"),
                TrackInfo::new(1, TrackType::Audio, "ac3")
                    .with_language("eng")
                    .with_title("Director's Commentary"),
                TrackInfo::new(2, TrackType::Audio, "aac").with_language("fra").with_default(true),
                TrackInfo::new(3, TrackType::Video, "h264"),
                TrackInfo::new(4, TrackType::Audio, "truehd").with_language("eng"),
                TrackInfo::new(5, TrackType::Subtitle, "subrip")
                    .with_language("eng")
                    .with_forced(true),
            ],
        )
    }

    #[test]
    fn track_order_groups_categories() {
        let commentary = CommentaryMatcher::default();
        let order = plan_track_order(
            &file().tracks,
            &TrackCategory::ALL,
            &config(),
            &commentary,
        );
        assert_eq!(order, vec![3, 4, 2, 1, 0, 5]);
    }

    #[test]
    fn track_order_puts_unlisted_last() {
        let commentary = CommentaryMatcher::default();
        let order = plan_track_order(
            &file().tracks,
            &[TrackCategory::Video, TrackCategory::AudioMain],
            &config(),
            &commentary,
        );
        assert_eq!(order, vec![3, 4, 0, 1, 2, 5]);
    }

    #[test]
    fn default_flags_prefer_language_and_skip_commentary() {
        let commentary = CommentaryMatcher::default();
        let changes = plan_default_flags(
            &file(),
            &DefaultFlagsConfig::default(),
            &config(),
            &commentary,
        );
        assert_eq!(
            changes,
            vec![
                TrackFlagChange {
                    track_index: 2,
                    flag: FlagType::Default,
                    value: false
                },
                TrackFlagChange {
                    track_index: 3,
                    flag: FlagType::Default,
                    value: true
                },
                TrackFlagChange {
                    track_index: 4,
                    flag: FlagType::Default,
                    value: true
                },
            ]
        );
    }

    #[test]
    fn default_flags_noop_when_already_set() {
        let commentary = CommentaryMatcher::default();
        let mut file = file();
        file.tracks[2].is_default = false;
        file.tracks[3].is_default = true;
        file.tracks[4].is_default = true;
        let changes = plan_default_flags(
            &file,
            &DefaultFlagsConfig::default(),
            &config(),
            &commentary,
        );
        assert!(changes.is_empty());
    }
}
