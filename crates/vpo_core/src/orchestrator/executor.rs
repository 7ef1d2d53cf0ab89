//! Phase executor: runs a policy's phases against one file.
//!
//! Each phase is atomic. Before it runs, the executor records a restore
//! point (an `Arc` to the current state plus a backup of the file bytes);
//! if any operation fails the file and the state go back to exactly that
//! point.

use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Settings;
use crate::language::MultiSampleConfig;
use crate::logging::{JobLogger, LogConfig};
use crate::models::{CommentaryMatcher, FileInfo};
use crate::policy::{OnError, OperationKind, Phase, Policy};

use super::cancel::CancelHandle;
use super::collaborators::{Collaborators, RestorePoint};
use super::errors::{ExecutionError, ExecutionResult, OperationError};
use super::operations::{run_operation, OperationContext};
use super::skip::{skip_reason, unmet_dependency};
use super::snapshot::SnapshotArena;
use super::types::{
    ExecutionState, FileOutcome, PhaseExecutionReport, PhaseFailure, PhaseReport, PhaseStatus,
};

const EMPTY_PHASE_WARNING: &str = "Phase has no operations defined";

/// A phase failure with the operation it happened in.
struct FailedAt {
    operation: Option<OperationKind>,
    error: OperationError,
}

impl FailedAt {
    fn outside(error: impl Into<OperationError>) -> Self {
        Self {
            operation: None,
            error: error.into(),
        }
    }
}

/// Runs phases for one file at a time. Shareable across worker threads.
pub struct PhaseExecutor {
    collaborators: Collaborators,
    sample_config: MultiSampleConfig,
    log_config: LogConfig,
    cancel: CancelHandle,
}

impl PhaseExecutor {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            sample_config: MultiSampleConfig::default(),
            log_config: LogConfig::default(),
            cancel: CancelHandle::new(),
        }
    }

    /// Executor using the sampling and logging sections of `settings`.
    pub fn configured(collaborators: Collaborators, settings: &Settings) -> Self {
        Self::new(collaborators)
            .with_sample_config(settings.multi_sample_config())
            .with_log_config(settings.log_config())
    }

    pub fn with_sample_config(mut self, config: MultiSampleConfig) -> Self {
        self.sample_config = config;
        self
    }

    pub fn with_log_config(mut self, config: LogConfig) -> Self {
        self.log_config = config;
        self
    }

    /// Share an existing cancellation flag.
    pub fn with_cancel_handle(mut self, cancel: CancelHandle) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn log_config(&self) -> &LogConfig {
        &self.log_config
    }

    /// Evaluate `policy` against the file at `path`, logging to a detached logger.
    ///
    /// `requested` restricts the run to the named phases, keeping policy
    /// order. An unknown name fails before the file is touched.
    pub fn evaluate(
        &self,
        path: &Path,
        file_info: FileInfo,
        policy: &Policy,
        requested: Option<&[String]>,
    ) -> ExecutionResult<PhaseExecutionReport> {
        let logger = JobLogger::detached(display_name(path), self.log_config.clone());
        self.evaluate_with_logger(path, file_info, policy, requested, &logger)
    }

    pub fn evaluate_with_logger(
        &self,
        path: &Path,
        file_info: FileInfo,
        policy: &Policy,
        requested: Option<&[String]>,
        logger: &JobLogger,
    ) -> ExecutionResult<PhaseExecutionReport> {
        let phases = select_phases(policy, requested)?;
        let names: Vec<&str> = phases.iter().map(|p| p.name()).collect();
        let mut report = PhaseExecutionReport::new(path, &names, file_info.clone());

        let commentary = CommentaryMatcher::new(&policy.config().commentary_patterns)
            .unwrap_or_else(|e| {
                warn!("Invalid commentary pattern, commentary detection disabled: {}", e);
                CommentaryMatcher::empty()
            });
        let ctx = OperationContext {
            path,
            config: policy.config(),
            commentary: &commentary,
            collaborators: &self.collaborators,
            sample_config: &self.sample_config,
            logger,
        };

        let mut state = Arc::new(ExecutionState::new(file_info));
        let mut arena = SnapshotArena::new();
        info!(file = %path.display(), phases = names.len(), "Evaluating policy");

        for (sequence, phase) in phases.iter().enumerate() {
            let name = phase.name();

            if phase.is_empty() {
                logger.warn(&format!("{}: {}", name, EMPTY_PHASE_WARNING));
                let entry = &mut report.phases[sequence];
                entry.warnings.push(EMPTY_PHASE_WARNING.to_string());
                entry.skip(EMPTY_PHASE_WARNING);
                continue;
            }
            if let Some(reason) = unmet_dependency(phase, &report.phases) {
                logger.info(&format!("Phase '{}' skipped: {}", name, reason));
                report.phases[sequence].skip(reason);
                continue;
            }
            if let Some(reason) = phase
                .skip_when()
                .and_then(|condition| skip_reason(condition, &state.file_info))
            {
                logger.info(&format!("Phase '{}' skipped: {}", name, reason));
                report.phases[sequence].skip(reason);
                continue;
            }

            logger.phase(name);
            report.phases[sequence].status = PhaseStatus::Running;

            let result = self.run_phase(
                sequence,
                phase,
                &ctx,
                &mut state,
                &mut arena,
                &mut report.phases[sequence],
            );
            let failure = match result {
                Ok(()) => {
                    let entry = &mut report.phases[sequence];
                    entry.status = PhaseStatus::Committed;
                    logger.success(&format!(
                        "Phase '{}' committed ({} change(s))",
                        name, entry.change_count
                    ));
                    continue;
                }
                Err(failure) => failure,
            };

            let cancelled = failure.error.is_cancelled();
            logger.error(&format!("Phase '{}' failed: {}", name, failure.error));
            {
                let entry = &mut report.phases[sequence];
                entry.change_count = 0;
                entry.error = Some(PhaseFailure {
                    operation: failure.operation,
                    message: failure.error.to_string(),
                });
            }

            if let Some(snapshot) = arena.take(sequence) {
                if let Err(source) = self.collaborators.backups.restore(&snapshot.restore_point) {
                    logger.error(&format!("Rollback of phase '{}' failed: {}", name, source));
                    logger.show_tail(name);
                    report.outcome = FileOutcome::Failure;
                    report.skip_flags = state.skip_flags;
                    report.file_info = state.file_info.clone();
                    return Err(ExecutionError::RollbackFailed {
                        phase: name.to_string(),
                        source,
                        report: Box::new(report),
                    });
                }
                self.discard(&snapshot.restore_point, logger);
                state = snapshot.state;
                logger.rollback(&format!("Phase '{}' restored to its restore point", name));
            }
            report.phases[sequence].status = PhaseStatus::RolledBack;

            report.outcome = match policy.config().on_error {
                _ if cancelled => FileOutcome::Failure,
                OnError::Fail => FileOutcome::Failure,
                OnError::Continue => FileOutcome::PartialFailure,
            };
            logger.show_tail(name);
            break;
        }

        if report.outcome == FileOutcome::Running {
            report.outcome = FileOutcome::Success;
        }
        report.skip_flags = state.skip_flags;
        report.file_info = state.file_info.clone();
        info!(
            file = %path.display(),
            outcome = ?report.outcome,
            changes = report.total_changes(),
            "Policy evaluation finished"
        );
        Ok(report)
    }

    fn run_phase(
        &self,
        sequence: usize,
        phase: &Phase,
        ctx: &OperationContext<'_>,
        state: &mut Arc<ExecutionState>,
        arena: &mut SnapshotArena,
        entry: &mut PhaseReport,
    ) -> Result<(), FailedAt> {
        let restore_point = self
            .collaborators
            .backups
            .create(ctx.path)
            .map_err(FailedAt::outside)?;
        arena.record(sequence, Arc::clone(state), restore_point);

        let mut mutated = false;
        for operation in phase.canonical_operations() {
            let kind = operation.kind();
            if self.cancel.is_cancelled() {
                return Err(FailedAt {
                    operation: Some(kind),
                    error: OperationError::Cancelled { operation: kind },
                });
            }

            ctx.logger.section(kind.as_str());
            let output = run_operation(operation, ctx, Arc::make_mut(state)).map_err(|error| {
                FailedAt {
                    operation: Some(kind),
                    error,
                }
            })?;
            entry.change_count += output.change_count;
            entry.warnings.extend(output.warnings);
            mutated |= output.mutated;
        }

        if mutated {
            ctx.logger.debug("Re-introspecting after phase changes");
            let refreshed = self
                .collaborators
                .introspector
                .get_file_info(ctx.path)
                .map_err(FailedAt::outside)?;
            Arc::make_mut(state).refresh(refreshed);
        }

        if let Some(snapshot) = arena.take(sequence) {
            self.discard(&snapshot.restore_point, ctx.logger);
        }
        Ok(())
    }

    fn discard(&self, point: &RestorePoint, logger: &JobLogger) {
        if let Err(e) = self.collaborators.backups.discard(point) {
            logger.warn(&format!("Could not discard restore point: {}", e));
        }
    }
}

/// Phases to run, in policy order.
pub(crate) fn select_phases<'p>(
    policy: &'p Policy,
    requested: Option<&[String]>,
) -> ExecutionResult<Vec<&'p Phase>> {
    let Some(requested) = requested else {
        return Ok(policy.phases().iter().collect());
    };

    let missing: Vec<String> = requested
        .iter()
        .filter(|name| policy.phase(name).is_none())
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Err(ExecutionError::phase_not_found(missing, policy.phase_names()));
    }

    Ok(policy
        .phases()
        .iter()
        .filter(|phase| requested.iter().any(|name| name == phase.name()))
        .collect())
}

pub(crate) fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TrackInfo, TrackType};
    use crate::orchestrator::testing::{FakeMedia, FixedLanguagePlugin, ScriptedLanguagePlugin};
    use std::collections::HashMap;
    use std::path::PathBuf;

    const FILE: &str = "/media/movie.mkv";

    fn movie() -> FileInfo {
        FileInfo::new(
            "matroska,webm",
            vec![
                TrackInfo::new(0, TrackType::Video, "h264")
                    .with_dimensions(1920, 1080)
                    .with_duration(600.0),
                TrackInfo::new(1, TrackType::Audio, "aac")
                    .with_language("eng")
                    .with_channels(2)
                    .with_duration(600.0),
                TrackInfo::new(2, TrackType::Audio, "ac3")
                    .with_language("fre")
                    .with_channels(6)
                    .with_duration(600.0),
                TrackInfo::new(3, TrackType::Subtitle, "subrip").with_language("eng"),
            ],
        )
    }

    fn policy(phases: &str, on_error: &str) -> Policy {
        Policy::from_json(&format!(
            r#"{{"schema_version": 12, "config": {{"on_error": "{}"}}, "phases": {}}}"#,
            on_error, phases
        ))
        .unwrap()
    }

    fn run(media: &Arc<FakeMedia>, policy: &Policy) -> PhaseExecutionReport {
        PhaseExecutor::new(media.collaborators())
            .evaluate(Path::new(FILE), media.file(FILE), policy, None)
            .unwrap()
    }

    const FILTER: &str =
        r#"{"name": "filter", "operations": [{"audio_filter": {"languages": ["eng"]}}]}"#;
    const REQUIRE_JAPANESE: &str = r#"{"name": "check", "operations": [{"conditional": [{
        "name": "need_jpn",
        "when": {"not": {"exists": {"track_type": "audio", "filters": {"language": ["jpn"]}}}},
        "then": [{"fail": "no japanese audio"}]
    }]}]}"#;

    #[test]
    fn committed_phase_reintrospects() {
        let media = FakeMedia::with_file(FILE, movie());
        let report = run(&media, &policy(&format!("[{}]", FILTER), "fail"));

        assert_eq!(report.outcome, FileOutcome::Success);
        let phase = report.phase("filter").unwrap();
        assert_eq!(phase.status, PhaseStatus::Committed);
        assert_eq!(phase.change_count, 1);
        assert_eq!(media.remuxes.lock().len(), 1);
        assert_eq!(media.file(FILE).tracks.len(), 3);
        assert_eq!(report.file_info, media.file(FILE));
        assert_eq!(media.live_backups(), 0);
    }

    #[test]
    fn empty_phase_is_skipped_with_warning() {
        let media = FakeMedia::with_file(FILE, movie());
        let report = run(
            &media,
            &policy(&format!(r#"[{{"name": "empty"}}, {}]"#, FILTER), "fail"),
        );

        let empty = report.phase("empty").unwrap();
        assert_eq!(empty.status, PhaseStatus::Skipped);
        assert_eq!(empty.warnings, vec![EMPTY_PHASE_WARNING.to_string()]);
        assert_eq!(report.phase("filter").unwrap().status, PhaseStatus::Committed);
        assert_eq!(report.outcome, FileOutcome::Success);
    }

    #[test]
    fn conditional_failure_follows_on_error() {
        let phases = format!("[{}, {}]", REQUIRE_JAPANESE, FILTER);

        let media = FakeMedia::with_file(FILE, movie());
        let report = run(&media, &policy(&phases, "fail"));
        assert_eq!(report.outcome, FileOutcome::Failure);
        let check = report.phase("check").unwrap();
        assert_eq!(check.status, PhaseStatus::RolledBack);
        let error = check.error.as_ref().unwrap();
        assert_eq!(error.operation, Some(OperationKind::Conditional));
        assert!(error.message.contains("no japanese audio"));
        assert_eq!(report.phase("filter").unwrap().status, PhaseStatus::Pending);
        assert!(media.remuxes.lock().is_empty());

        let media = FakeMedia::with_file(FILE, movie());
        let report = run(&media, &policy(&phases, "continue"));
        assert_eq!(report.outcome, FileOutcome::PartialFailure);
        assert_eq!(report.phase("filter").unwrap().status, PhaseStatus::Pending);
    }

    #[test]
    fn failed_phase_restores_its_restore_point_only() {
        let media = FakeMedia::with_file(FILE, movie());
        media.fail_tool("transcode");
        let encode = r#"{"name": "encode", "operations": [
            {"transcode": {"video": {"target_codec": "hevc"}}},
            {"audio_filter": {"languages": ["eng"]}},
            {"conditional": [{"name": "flag", "when": {"exists": {"track_type": "video"}},
                              "then": [{"skip": "audio_transcode"}]}]}
        ]}"#;
        let phases = format!(
            r#"[{{"name": "order", "operations": [{{"track_order": {{
                "order": ["video", "audio_alternate", "audio_main", "subtitle_main"]
            }}}}]}}, {}]"#,
            encode
        );
        let report = run(&media, &policy(&phases, "continue"));

        let order = report.phase("order").unwrap();
        assert_eq!(order.status, PhaseStatus::Committed);
        let after_order = media.file(FILE);
        assert_eq!(after_order.tracks[1].language, "fre");

        let encode = report.phase("encode").unwrap();
        assert_eq!(encode.status, PhaseStatus::RolledBack);
        assert_eq!(encode.change_count, 0);
        assert_eq!(
            encode.error.as_ref().unwrap().operation,
            Some(OperationKind::Transcode)
        );
        assert_eq!(report.outcome, FileOutcome::PartialFailure);

        // The order phase and the filter remuxed before the transcode failed.
        assert_eq!(media.remuxes.lock().len(), 2);
        assert_eq!(*media.restores.lock(), 1);
        assert_eq!(media.file(FILE), after_order);
        assert_eq!(report.file_info, after_order);
        assert!(report.skip_flags.is_empty());
        assert_eq!(media.live_backups(), 0);
    }

    #[test]
    fn unknown_phase_touches_nothing() {
        let media = FakeMedia::with_file(FILE, movie());
        let policy = policy(&format!("[{}]", FILTER), "fail");
        let err = PhaseExecutor::new(media.collaborators())
            .evaluate(
                Path::new(FILE),
                movie(),
                &policy,
                Some(&["filter".to_string(), "nope".to_string()]),
            )
            .unwrap_err();

        match err {
            ExecutionError::PhaseNotFound {
                requested,
                available,
            } => {
                assert_eq!(requested, vec!["nope"]);
                assert_eq!(available, vec!["filter"]);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(media.remuxes.lock().is_empty());
        assert_eq!(media.live_backups(), 0);
        assert_eq!(media.file(FILE), movie());
    }

    #[test]
    fn requested_phases_keep_policy_order() {
        let media = FakeMedia::with_file(FILE, movie());
        let policy = policy(&format!(r#"[{}, {{"name": "empty"}}]"#, FILTER), "fail");
        let report = PhaseExecutor::new(media.collaborators())
            .evaluate(
                Path::new(FILE),
                movie(),
                &policy,
                Some(&["empty".to_string(), "filter".to_string()]),
            )
            .unwrap();
        let names: Vec<&str> = report.phases.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["filter", "empty"]);
    }

    #[test]
    fn skip_when_and_dependencies() {
        let media = FakeMedia::with_file(FILE, movie());
        let phases = format!(
            r#"[
                {{"name": "encode", "skip_when": {{"video_codec": ["h264"]}},
                  "operations": [{{"transcode": {{"video": {{"target_codec": "hevc"}}}}}}]}},
                {{"name": "after", "depends_on": ["encode"],
                  "operations": [{{"audio_filter": {{"languages": ["eng"]}}}}]}},
                {}
            ]"#,
            FILTER
        );
        let report = run(&media, &policy(&phases, "fail"));

        let encode = report.phase("encode").unwrap();
        assert_eq!(encode.status, PhaseStatus::Skipped);
        assert_eq!(encode.skip_reason.as_deref(), Some("video_codec matches [h264]"));
        let after = report.phase("after").unwrap();
        assert_eq!(after.status, PhaseStatus::Skipped);
        assert!(after.skip_reason.as_ref().unwrap().contains("dependency 'encode'"));
        assert_eq!(report.phase("filter").unwrap().status, PhaseStatus::Committed);
        assert!(media.transcodes.lock().is_empty());
        assert_eq!(report.outcome, FileOutcome::Success);
    }

    #[test]
    fn cancellation_fails_the_file() {
        let media = FakeMedia::with_file(FILE, movie());
        let executor = PhaseExecutor::new(media.collaborators());
        executor.cancel_handle().cancel();

        let report = executor
            .evaluate(
                Path::new(FILE),
                movie(),
                &policy(&format!("[{}]", FILTER), "continue"),
                None,
            )
            .unwrap();
        assert_eq!(report.outcome, FileOutcome::Failure);
        let filter = report.phase("filter").unwrap();
        assert_eq!(filter.status, PhaseStatus::RolledBack);
        assert!(filter.error.as_ref().unwrap().message.starts_with("Cancelled before"));
        assert!(media.remuxes.lock().is_empty());
    }

    #[test]
    fn failed_restore_is_unrecoverable() {
        let media = FakeMedia::with_file(FILE, movie());
        media.fail_tool("remux");
        media.fail_restore();

        let err = PhaseExecutor::new(media.collaborators())
            .evaluate(
                Path::new(FILE),
                movie(),
                &policy(&format!("[{}]", FILTER), "continue"),
                None,
            )
            .unwrap_err();
        assert!(err.is_unrecoverable());
        match err {
            ExecutionError::RollbackFailed { phase, report, .. } => {
                assert_eq!(phase, "filter");
                assert_eq!(report.outcome, FileOutcome::Failure);
                assert!(report.phase("filter").unwrap().error.is_some());
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn matching_codec_skips_video_transcode() {
        let mut info = movie();
        info.tracks[0].codec = "hevc".to_string();
        let media = FakeMedia::with_file(FILE, info);
        let phases = r#"[{"name": "encode", "operations": [{"transcode": {"video": {
            "target_codec": "hevc", "skip_if": {"codec_matches": ["hevc", "h265"]}
        }}}]}]"#;
        let report = run(&media, &policy(phases, "fail"));

        assert_eq!(report.phase("encode").unwrap().status, PhaseStatus::Committed);
        assert_eq!(report.phase("encode").unwrap().change_count, 0);
        assert!(media.transcodes.lock().is_empty());
        assert_eq!(media.live_backups(), 0);
    }

    #[test]
    fn transcription_updates_track_language() {
        let media = FakeMedia::with_file(FILE, movie());
        let plugin = FixedLanguagePlugin {
            languages: HashMap::from([(1, "jpn"), (2, "fre")]),
        };
        let collaborators = media.collaborators().with_transcriber(Arc::new(plugin));
        let phases = r#"[{"name": "detect", "operations": [
            {"transcription": {"update_language": true}}
        ]}]"#;

        let report = PhaseExecutor::new(collaborators)
            .evaluate(Path::new(FILE), movie(), &policy(phases, "fail"), None)
            .unwrap();

        assert_eq!(report.outcome, FileOutcome::Success);
        assert_eq!(report.phase("detect").unwrap().change_count, 1);
        assert_eq!(media.extracts.lock().len(), 6);
        assert_eq!(media.file(FILE).tracks[1].language, "jpn");
        assert_eq!(media.file(FILE).tracks[2].language, "fre");
        assert_eq!(report.file_path, PathBuf::from(FILE));
    }

    #[test]
    fn transcription_without_plugin_warns() {
        let media = FakeMedia::with_file(FILE, movie());
        let phases = r#"[{"name": "detect", "operations": [{"transcription": {}}]}]"#;
        let report = run(&media, &policy(phases, "fail"));

        let detect = report.phase("detect").unwrap();
        assert_eq!(detect.status, PhaseStatus::Committed);
        assert_eq!(detect.warnings.len(), 1);
        assert!(media.extracts.lock().is_empty());
    }

    #[test]
    fn incumbent_bonus_keeps_tagged_language() {
        // Track 1 is tagged eng; its two samples split jpn 0.9 / eng 0.8.
        let detect = |bonus: f64| {
            let media = FakeMedia::with_file(FILE, movie());
            let plugin = ScriptedLanguagePlugin::new(HashMap::from([
                (1, vec![("jpn", 0.9), ("eng", 0.8)]),
                (2, vec![("fre", 0.9)]),
            ]));
            let collaborators = media.collaborators().with_transcriber(Arc::new(plugin));
            let sampling = MultiSampleConfig {
                max_samples: 2,
                incumbent_bonus: bonus,
                ..MultiSampleConfig::default()
            };
            let phases = r#"[{"name": "detect", "operations": [
                {"transcription": {"update_language": true}}
            ]}]"#;
            let report = PhaseExecutor::new(collaborators)
                .with_sample_config(sampling)
                .evaluate(Path::new(FILE), movie(), &policy(phases, "fail"), None)
                .unwrap();
            assert_eq!(report.outcome, FileOutcome::Success);
            (report.phase("detect").unwrap().change_count, media.file(FILE))
        };

        let (changes, file) = detect(0.15);
        assert_eq!(changes, 0);
        assert_eq!(file.tracks[1].language, "eng");

        let (changes, file) = detect(0.0);
        assert_eq!(changes, 1);
        assert_eq!(file.tracks[1].language, "jpn");
        assert_eq!(file.tracks[2].language, "fre");
    }

    #[test]
    fn second_run_makes_no_changes() {
        let source = FileInfo::new(
            "matroska,webm",
            vec![
                TrackInfo::new(0, TrackType::Video, "h264").with_dimensions(1920, 1080),
                TrackInfo::new(1, TrackType::Audio, "ac3")
                    .with_language("fre")
                    .with_channels(6),
                TrackInfo::new(2, TrackType::Audio, "aac")
                    .with_language("eng")
                    .with_channels(2),
                TrackInfo::new(3, TrackType::Subtitle, "subrip").with_language("eng"),
                TrackInfo::new(4, TrackType::Audio, "aac")
                    .with_language("jpn")
                    .with_channels(2),
            ],
        );
        let media = FakeMedia::with_file(FILE, source);
        let phases = r#"[{"name": "normalize", "operations": [
            {"container": {"target": "mp4"}},
            {"audio_filter": {"languages": ["eng", "fre"]}},
            {"track_order": {}},
            {"default_flags": {}},
            {"audio_synthesis": {"tracks": [{
                "name": "opus_stereo", "codec": "opus", "channels": "stereo",
                "prefer": [{"language": ["fre"]}],
                "skip_if_exists": {"codec": ["opus"]}
            }]}},
            {"transcode": {"video": {"target_codec": "hevc"}}}
        ]}]"#;
        let policy = policy(phases, "fail");

        let first = run(&media, &policy);
        assert_eq!(first.outcome, FileOutcome::Success);
        // mov_text + mp4, jpn removed, two tracks swapped, two defaults,
        // one synthesized track, one video encode
        assert_eq!(first.phase("normalize").unwrap().change_count, 9);
        let converted = media.file(FILE);
        assert_eq!(converted.container_format, "mp4");
        let codecs: Vec<&str> = converted.tracks.iter().map(|t| t.codec.as_str()).collect();
        assert_eq!(codecs, vec!["hevc", "aac", "ac3", "opus", "mov_text"]);

        let remuxes = media.remuxes.lock().len();
        let transcodes = media.transcodes.lock().len();
        let second = run(&media, &policy);
        assert_eq!(second.outcome, FileOutcome::Success);
        let phase = second.phase("normalize").unwrap();
        assert_eq!(phase.status, PhaseStatus::Committed);
        assert_eq!(phase.change_count, 0);
        assert_eq!(media.remuxes.lock().len(), remuxes);
        assert_eq!(media.transcodes.lock().len(), transcodes);
        assert_eq!(media.file(FILE), converted);
        assert_eq!(media.live_backups(), 0);
    }

    #[test]
    fn failure_after_one_mutation_restores_original() {
        let media = FakeMedia::with_file(FILE, movie());
        media.fail_tool("transcode");
        let phases = r#"[{"name": "tidy", "operations": [
            {"audio_filter": {"languages": ["eng"]}},
            {"transcode": {"video": {"target_codec": "hevc"}}}
        ]}]"#;
        let report = run(&media, &policy(phases, "fail"));

        assert_eq!(report.outcome, FileOutcome::Failure);
        let tidy = report.phase("tidy").unwrap();
        assert_eq!(tidy.status, PhaseStatus::RolledBack);
        assert_eq!(tidy.change_count, 0);
        assert_eq!(
            tidy.error.as_ref().unwrap().operation,
            Some(OperationKind::Transcode)
        );
        assert_eq!(media.remuxes.lock().len(), 1);
        assert_eq!(*media.restores.lock(), 1);
        assert_eq!(media.file(FILE), movie());
        assert_eq!(report.file_info, movie());
        assert!(report.skip_flags.is_empty());
        assert_eq!(media.live_backups(), 0);
    }
}
