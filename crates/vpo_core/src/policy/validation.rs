//! Structural validation of policy documents.
//!
//! Every problem is collected with the dotted path of the offending field;
//! a document with any problem is rejected as a whole.

use std::collections::HashSet;

use regex::RegexBuilder;

use crate::actions::{ConditionalAction, ConditionalRule};
use crate::conditions::{Comparison, Condition, NumericMatch, TitleMatch, TrackFilters};
use crate::synthesis::{AudioSynthesisConfig, ChannelMatch, TrackPosition};
use crate::transcode::{
    parse_bitrate, resolution_preset, QualityMode, TranscodeConfig, VideoTranscodeConfig,
};

use super::errors::{FieldError, SchemaValidationError};
use super::operations::{Operation, OperationKind};
use super::types::{PhaseSkipCondition, PolicyDocument, RESERVED_PHASE_NAMES, SCHEMA_VERSION};

/// `[A-Za-z][A-Za-z0-9_-]{0,63}`
fn is_valid_phase_name(name: &str) -> bool {
    let mut chars = name.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && name.len() <= 64
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

#[derive(Default)]
struct Errors(Vec<FieldError>);

impl Errors {
    fn push(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError::new(path, message));
    }
}

pub(super) fn validate(document: &PolicyDocument) -> Result<(), SchemaValidationError> {
    let mut errors = Errors::default();

    if document.schema_version != SCHEMA_VERSION {
        errors.push(
            "schema_version",
            format!("expected {}, got {}", SCHEMA_VERSION, document.schema_version),
        );
    }

    for (i, pattern) in document.config.commentary_patterns.iter().enumerate() {
        if let Err(e) = RegexBuilder::new(pattern).case_insensitive(true).build() {
            errors.push(
                format!("config.commentary_patterns[{}]", i),
                format!("invalid regex: {}", e),
            );
        }
    }
    if document.config.audio_languages.is_empty() {
        errors.push("config.audio_languages", "must not be empty");
    }

    if document.phases.is_empty() {
        errors.push("phases", "at least one phase is required");
    }

    let mut seen: HashSet<String> = HashSet::new();
    for (i, phase) in document.phases.iter().enumerate() {
        let path = format!("phases[{}]", i);
        validate_phase_name(&phase.name, &path, &seen, &mut errors);

        for (j, dependency) in phase.depends_on.iter().enumerate() {
            if !seen.contains(&dependency.to_ascii_lowercase()) {
                errors.push(
                    format!("{}.depends_on[{}]", path, j),
                    format!("'{}' is not an earlier phase", dependency),
                );
            }
        }
        if let Some(skip) = &phase.skip_when {
            validate_skip_when(skip, &format!("{}.skip_when", path), &mut errors);
        }

        let mut kinds: HashSet<OperationKind> = HashSet::new();
        for (j, operation) in phase.operations.iter().enumerate() {
            let op_path = format!("{}.operations[{}].{}", path, j, operation.kind());
            if !kinds.insert(operation.kind()) {
                errors.push(op_path.clone(), "operation appears more than once in this phase");
            }
            validate_operation(operation, &op_path, &mut errors);
        }

        seen.insert(phase.name.to_ascii_lowercase());
    }

    if errors.0.is_empty() {
        Ok(())
    } else {
        Err(SchemaValidationError { errors: errors.0 })
    }
}

fn validate_phase_name(name: &str, path: &str, seen: &HashSet<String>, errors: &mut Errors) {
    let path = format!("{}.name", path);
    if !is_valid_phase_name(name) {
        errors.push(
            path.clone(),
            format!(
                "'{}' must start with a letter and contain only letters, digits, \
                 '_' or '-' (max 64)",
                name
            ),
        );
    }
    let lowered = name.to_ascii_lowercase();
    if RESERVED_PHASE_NAMES.contains(&lowered.as_str()) {
        errors.push(path.clone(), format!("'{}' is a reserved name", name));
    }
    if seen.contains(&lowered) {
        errors.push(path, format!("duplicate phase name '{}'", name));
    }
}

fn validate_skip_when(skip: &PhaseSkipCondition, path: &str, errors: &mut Errors) {
    if skip.is_empty() {
        errors.push(path, "at least one condition is required");
    }
    for (field, value) in [
        ("resolution", &skip.resolution),
        ("resolution_under", &skip.resolution_under),
    ] {
        if let Some(preset) = value {
            if resolution_preset(preset).is_none() {
                errors.push(
                    format!("{}.{}", path, field),
                    format!("unknown resolution '{}'", preset),
                );
            }
        }
    }
}

fn validate_operation(operation: &Operation, path: &str, errors: &mut Errors) {
    match operation {
        Operation::Container(_) | Operation::AttachmentFilter(_) | Operation::DefaultFlags(_) => {}
        Operation::AudioFilter(config) => {
            if config.languages.is_empty() {
                errors.push(format!("{}.languages", path), "must not be empty");
            }
        }
        Operation::SubtitleFilter(config) => {
            if config.languages.as_ref().is_some_and(|l| l.is_empty()) {
                errors.push(format!("{}.languages", path), "must not be empty when set");
            }
        }
        Operation::TrackOrder(config) => {
            if config.order.is_empty() {
                errors.push(format!("{}.order", path), "must not be empty");
            }
            let unique: HashSet<_> = config.order.iter().collect();
            if unique.len() != config.order.len() {
                errors.push(format!("{}.order", path), "categories must not repeat");
            }
        }
        Operation::Conditional(rules) => validate_rules(rules, path, errors),
        Operation::AudioSynthesis(config) => validate_synthesis(config, path, errors),
        Operation::Transcode(config) => validate_transcode(config, path, errors),
        Operation::Transcription(config) => {
            if !(0.0..=1.0).contains(&config.confidence_threshold) {
                errors.push(
                    format!("{}.confidence_threshold", path),
                    "must be between 0.0 and 1.0",
                );
            }
        }
    }
}

fn validate_rules(rules: &[ConditionalRule], path: &str, errors: &mut Errors) {
    if rules.is_empty() {
        errors.push(path, "at least one rule is required");
    }
    let mut names = HashSet::new();
    for (i, rule) in rules.iter().enumerate() {
        let rule_path = format!("{}[{}]", path, i);
        if rule.name.trim().is_empty() {
            errors.push(format!("{}.name", rule_path), "must not be empty");
        } else if !names.insert(rule.name.as_str()) {
            errors.push(
                format!("{}.name", rule_path),
                format!("duplicate rule name '{}'", rule.name),
            );
        }
        validate_condition(&rule.when, &format!("{}.when", rule_path), errors);
        for (branch, actions) in [("then", &rule.then), ("else", &rule.otherwise)] {
            for (j, action) in actions.iter().enumerate() {
                if let ConditionalAction::Warn(msg) | ConditionalAction::Fail(msg) = action {
                    if msg.trim().is_empty() {
                        errors.push(
                            format!("{}.{}[{}]", rule_path, branch, j),
                            "message must not be empty",
                        );
                    }
                }
            }
        }
    }
}

fn validate_condition(condition: &Condition, path: &str, errors: &mut Errors) {
    match condition {
        Condition::Exists(query) => {
            validate_filters(&query.filters, &format!("{}.exists", path), errors)
        }
        Condition::Count(count) => {
            validate_filters(&count.query.filters, &format!("{}.count", path), errors)
        }
        Condition::Not(inner) => validate_condition(inner, &format!("{}.not", path), errors),
        Condition::And(parts) | Condition::Or(parts) => {
            let key = if matches!(condition, Condition::And(_)) { "and" } else { "or" };
            let sub_path = format!("{}.{}", path, key);
            if parts.len() < 2 {
                errors.push(sub_path.clone(), "requires at least two conditions");
            }
            for (i, part) in parts.iter().enumerate() {
                validate_condition(part, &format!("{}[{}]", sub_path, i), errors);
            }
        }
        Condition::AudioIsMultiLanguage(cond) => {
            if !(0.0..=1.0).contains(&cond.threshold) {
                errors.push(
                    format!("{}.audio_is_multi_language.threshold", path),
                    "must be between 0.0 and 1.0",
                );
            }
        }
    }
}

fn validate_filters(filters: &TrackFilters, path: &str, errors: &mut Errors) {
    if filters.language.as_ref().is_some_and(|l| l.is_empty()) {
        errors.push(format!("{}.filters.language", path), "must not be empty when set");
    }
    for (field, value) in [
        ("channels", &filters.channels),
        ("width", &filters.width),
        ("height", &filters.height),
    ] {
        if let Some(NumericMatch::Range(cmp)) = value {
            validate_comparison(cmp, &format!("{}.filters.{}", path, field), errors);
        }
    }
    if let Some(TitleMatch::Pattern(pattern)) = &filters.title {
        if pattern.contains.is_none() && pattern.regex.is_none() {
            errors.push(format!("{}.filters.title", path), "needs contains or regex");
        }
        if let Some(re) = &pattern.regex {
            if let Err(e) = RegexBuilder::new(re).case_insensitive(true).build() {
                errors.push(
                    format!("{}.filters.title.regex", path),
                    format!("invalid regex: {}", e),
                );
            }
        }
    }
}

fn validate_comparison(cmp: &Comparison, path: &str, errors: &mut Errors) {
    if cmp.is_empty() {
        errors.push(path, "comparison needs one of eq, lt, lte, gt, gte");
    }
}

fn validate_synthesis(config: &AudioSynthesisConfig, path: &str, errors: &mut Errors) {
    if config.tracks.is_empty() {
        errors.push(format!("{}.tracks", path), "at least one track rule is required");
    }
    let mut names = HashSet::new();
    for (i, rule) in config.tracks.iter().enumerate() {
        let rule_path = format!("{}.tracks[{}]", path, i);
        if rule.name.trim().is_empty() {
            errors.push(format!("{}.name", rule_path), "must not be empty");
        } else if !names.insert(rule.name.as_str()) {
            errors.push(
                format!("{}.name", rule_path),
                format!("duplicate rule name '{}'", rule.name),
            );
        }
        if let Some(bitrate) = &rule.bitrate {
            if parse_bitrate(bitrate).is_none() {
                errors.push(
                    format!("{}.bitrate", rule_path),
                    format!("invalid bitrate '{}'", bitrate),
                );
            }
        }
        if rule.position == TrackPosition::Index(0) {
            errors.push(format!("{}.position", rule_path), "positions are 1-based");
        }
        if let Some(ChannelMatch::Range(cmp)) = rule
            .skip_if_exists
            .as_ref()
            .and_then(|s| s.channels.as_ref())
        {
            validate_comparison(cmp, &format!("{}.skip_if_exists.channels", rule_path), errors);
        }
        if let Some(condition) = &rule.create_if {
            validate_condition(condition, &format!("{}.create_if", rule_path), errors);
        }
    }
}

fn validate_transcode(config: &TranscodeConfig, path: &str, errors: &mut Errors) {
    if config.video.is_none() && config.audio.is_none() {
        errors.push(path, "video or audio settings are required");
    }
    if let Some(video) = &config.video {
        validate_video(video, &format!("{}.video", path), errors);
    }
    if let Some(audio) = &config.audio {
        if parse_bitrate(&audio.bitrate).is_none() {
            errors.push(
                format!("{}.audio.bitrate", path),
                format!("invalid bitrate '{}'", audio.bitrate),
            );
        }
    }
}

fn validate_video(video: &VideoTranscodeConfig, path: &str, errors: &mut Errors) {
    if let Some(skip) = &video.skip_if {
        let skip_path = format!("{}.skip_if", path);
        if skip.is_empty() {
            errors.push(skip_path.clone(), "an empty skip_if would skip every file");
        }
        if let Some(preset) = &skip.resolution_within {
            if resolution_preset(preset).is_none() {
                errors.push(
                    format!("{}.resolution_within", skip_path),
                    format!("unknown resolution '{}'", preset),
                );
            }
        }
        if let Some(limit) = &skip.bitrate_under {
            if parse_bitrate(limit).is_none() {
                errors.push(
                    format!("{}.bitrate_under", skip_path),
                    format!("invalid bitrate '{}'", limit),
                );
            }
        }
    }

    let quality = &video.quality;
    if quality.crf.is_some_and(|crf| crf > 51) {
        errors.push(format!("{}.quality.crf", path), "must be 0-51");
    }
    if quality.mode == QualityMode::Bitrate && quality.bitrate.is_none() {
        errors.push(format!("{}.quality.bitrate", path), "required when mode is bitrate");
    }
    for (field, value) in [("bitrate", &quality.bitrate), ("max_bitrate", &quality.max_bitrate)] {
        if let Some(raw) = value {
            if parse_bitrate(raw).is_none() {
                errors.push(
                    format!("{}.quality.{}", path, field),
                    format!("invalid bitrate '{}'", raw),
                );
            }
        }
    }

    if let Some(preset) = video.scaling.as_ref().and_then(|s| s.max_resolution.as_ref()) {
        if resolution_preset(preset).is_none() {
            errors.push(
                format!("{}.scaling.max_resolution", path),
                format!("unknown resolution '{}'", preset),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::is_valid_phase_name;
    use crate::policy::{Policy, PolicyDocument};

    #[test]
    fn phase_name_charset() {
        assert!(is_valid_phase_name("normalize-audio_2"));
        assert!(is_valid_phase_name(&"a".repeat(64)));
        assert!(!is_valid_phase_name(&"a".repeat(65)));
        assert!(!is_valid_phase_name("_hidden"));
        assert!(!is_valid_phase_name("has space"));
        assert!(!is_valid_phase_name(""));
    }

    fn document(json: &str) -> PolicyDocument {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn reports_every_problem_with_paths() {
        let doc = document(
            r#"{
                "schema_version": 3,
                "phases": [
                    {"name": "config"},
                    {"name": "9lives"},
                    {"name": "ok", "operations": [
                        {"audio_filter": {"languages": []}},
                        {"conditional": [{"name": "r", "when": {"and": [
                            {"exists": {"track_type": "audio"}}
                        ]}}]}
                    ]},
                    {"name": "OK"}
                ]
            }"#,
        );
        let err = Policy::from_document(doc).unwrap_err();
        assert!(err.has_error_at("schema_version"));
        assert!(err.has_error_at("phases[0].name"));
        assert!(err.has_error_at("phases[1].name"));
        assert!(err.has_error_at("phases[2].operations[0].audio_filter.languages"));
        assert!(err.has_error_at("phases[2].operations[1].conditional[0].when.and"));
        assert!(err.has_error_at("phases[3].name"));
    }

    #[test]
    fn empty_policy_is_rejected() {
        let err = Policy::from_document(document(r#"{"schema_version": 12}"#)).unwrap_err();
        assert!(err.has_error_at("phases"));
    }

    #[test]
    fn depends_on_must_name_earlier_phase() {
        let doc = document(
            r#"{"schema_version": 12, "phases": [
                {"name": "a", "depends_on": ["b"]},
                {"name": "b", "depends_on": ["a"]}
            ]}"#,
        );
        let err = Policy::from_document(doc).unwrap_err();
        assert_eq!(err.errors.len(), 1);
        assert!(err.has_error_at("phases[0].depends_on[0]"));
    }

    #[test]
    fn transcode_settings_are_checked() {
        let doc = document(
            r#"{"schema_version": 12, "phases": [{"name": "video", "operations": [
                {"transcode": {"video": {
                    "target_codec": "hevc",
                    "skip_if": {"resolution_within": "999p"},
                    "quality": {"mode": "bitrate", "crf": 60}
                }}}
            ]}]}"#,
        );
        let err = Policy::from_document(doc).unwrap_err();
        let base = "phases[0].operations[0].transcode.video";
        assert!(err.has_error_at(&format!("{}.skip_if.resolution_within", base)));
        assert!(err.has_error_at(&format!("{}.quality.crf", base)));
        assert!(err.has_error_at(&format!("{}.quality.bitrate", base)));
    }

    #[test]
    fn duplicate_operations_are_rejected() {
        let doc = document(
            r#"{"schema_version": 12, "phases": [{"name": "p", "operations": [
                {"attachment_filter": {"remove_all": true}},
                {"attachment_filter": {}}
            ]}]}"#,
        );
        let err = Policy::from_document(doc).unwrap_err();
        assert!(err.has_error_at("phases[0].operations[1].attachment_filter"));
    }
}
