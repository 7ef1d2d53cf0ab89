//! Pure evaluation of predicate trees against file facts.

use std::collections::BTreeMap;

use regex::RegexBuilder;

use crate::language::MultiLanguageDetectionResult;
use crate::models::{
    codec_in, language_in, languages_match, CommentaryMatcher, TrackInfo, TrackType,
};

use super::types::{
    Condition, CountCondition, MultiLanguageCondition, TitleMatch, TrackFilters, TrackQuery,
};

/// Everything a predicate may look at.
#[derive(Debug, Clone, Copy)]
pub struct EvaluationFacts<'a> {
    pub tracks: &'a [TrackInfo],
    /// Language analysis keyed by track index.
    pub language_results: &'a BTreeMap<usize, MultiLanguageDetectionResult>,
    pub commentary: &'a CommentaryMatcher,
}

impl<'a> EvaluationFacts<'a> {
    pub fn new(
        tracks: &'a [TrackInfo],
        language_results: &'a BTreeMap<usize, MultiLanguageDetectionResult>,
        commentary: &'a CommentaryMatcher,
    ) -> Self {
        Self {
            tracks,
            language_results,
            commentary,
        }
    }
}

/// Evaluate a predicate. Identical facts always give the same answer.
pub fn evaluate(condition: &Condition, facts: &EvaluationFacts<'_>) -> bool {
    evaluate_with_reason(condition, facts).0
}

/// Evaluate a predicate and describe how the answer was reached.
pub fn evaluate_with_reason(condition: &Condition, facts: &EvaluationFacts<'_>) -> (bool, String) {
    match condition {
        Condition::Exists(query) => evaluate_exists(query, facts),
        Condition::Count(count) => evaluate_count(count, facts),
        Condition::Not(inner) => {
            let (result, reason) = evaluate_with_reason(inner, facts);
            (!result, format!("not({}) -> {}", reason, !result))
        }
        Condition::And(parts) => {
            for part in parts {
                let (result, reason) = evaluate_with_reason(part, facts);
                if !result {
                    return (false, format!("and -> false ({})", reason));
                }
            }
            (true, format!("and -> true ({} conditions)", parts.len()))
        }
        Condition::Or(parts) => {
            for part in parts {
                let (result, reason) = evaluate_with_reason(part, facts);
                if result {
                    return (true, format!("or -> true ({})", reason));
                }
            }
            (false, format!("or -> false ({} conditions)", parts.len()))
        }
        Condition::AudioIsMultiLanguage(cond) => evaluate_multi_language(cond, facts),
    }
}

/// True if the track passes every filter that is set.
pub fn matches_filters(
    track: &TrackInfo,
    filters: &TrackFilters,
    commentary: &CommentaryMatcher,
) -> bool {
    if let Some(languages) = &filters.language {
        if !language_in(&track.language, languages) {
            return false;
        }
    }
    if let Some(codecs) = &filters.codec {
        if !codec_in(&track.codec, codecs) {
            return false;
        }
    }
    if filters.is_default.is_some_and(|d| d != track.is_default) {
        return false;
    }
    if filters.is_forced.is_some_and(|f| f != track.is_forced) {
        return false;
    }
    if filters.channels.is_some_and(|m| !m.matches(track.channels)) {
        return false;
    }
    if filters.width.is_some_and(|m| !m.matches(track.width)) {
        return false;
    }
    if filters.height.is_some_and(|m| !m.matches(track.height)) {
        return false;
    }
    if let Some(title) = &filters.title {
        if !matches_title(track.title_str(), title) {
            return false;
        }
    }
    if filters.not_commentary && commentary.is_commentary(track) {
        return false;
    }
    true
}

fn matches_title(title: &str, matcher: &TitleMatch) -> bool {
    match matcher {
        TitleMatch::Contains(needle) => title.to_lowercase().contains(&needle.to_lowercase()),
        TitleMatch::Pattern(pattern) => {
            let contains_ok = pattern
                .contains
                .as_ref()
                .is_none_or(|needle| title.to_lowercase().contains(&needle.to_lowercase()));
            let regex_ok = pattern.regex.as_ref().is_none_or(|re| {
                RegexBuilder::new(re)
                    .case_insensitive(true)
                    .build()
                    .map(|re| re.is_match(title))
                    .unwrap_or(false)
            });
            contains_ok && regex_ok
        }
    }
}

fn matching_tracks<'a>(
    query: &'a TrackQuery,
    facts: EvaluationFacts<'a>,
) -> impl Iterator<Item = &'a TrackInfo> {
    let commentary = facts.commentary;
    facts.tracks.iter().filter(move |t| {
        t.track_type == query.track_type && matches_filters(t, &query.filters, commentary)
    })
}

fn evaluate_exists(query: &TrackQuery, facts: &EvaluationFacts<'_>) -> (bool, String) {
    match matching_tracks(query, *facts).next() {
        Some(track) => (
            true,
            format!("exists({}) -> true ({})", query.track_type, track.describe()),
        ),
        None => (false, format!("exists({}) -> false", query.track_type)),
    }
}

fn evaluate_count(count: &CountCondition, facts: &EvaluationFacts<'_>) -> (bool, String) {
    let actual = matching_tracks(&count.query, *facts).count() as u32;
    let result = count.operator.apply(actual, count.value);
    (
        result,
        format!(
            "count({}) = {} {} {} -> {}",
            count.query.track_type,
            actual,
            count.operator.symbol(),
            count.value,
            result
        ),
    )
}

fn evaluate_multi_language(
    cond: &MultiLanguageCondition,
    facts: &EvaluationFacts<'_>,
) -> (bool, String) {
    let ceiling = 1.0 - cond.threshold;
    let audio = facts.tracks.iter().filter(|t| {
        t.track_type == TrackType::Audio && cond.track_index.is_none_or(|i| i == t.index)
    });

    for track in audio {
        let Some(result) = facts.language_results.get(&track.index) else {
            continue;
        };
        let language_ok = cond
            .primary_language
            .as_ref()
            .is_none_or(|lang| languages_match(lang, &result.primary_language));
        if result.is_multi_language() && result.primary_percentage < ceiling && language_ok {
            return (
                true,
                format!(
                    "audio_is_multi_language -> true (track[{}] {} {:.0}%)",
                    track.index,
                    result.primary_language,
                    result.primary_percentage * 100.0
                ),
            );
        }
    }

    (false, "audio_is_multi_language -> false".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conditions::{Comparison, CompareOp, NumericMatch, TitlePattern};
    use crate::language::{LanguageClassification, MultiLanguageDetectionResult};

    fn tracks() -> Vec<TrackInfo> {
        vec![
            TrackInfo::new(0, TrackType::Video, "hevc").with_dimensions(1920, 1080),
            TrackInfo::new(1, TrackType::Audio, "eac3")
                .with_language("eng")
                .with_channels(6)
                .with_default(true),
            TrackInfo::new(2, TrackType::Audio, "aac")
                .with_language("eng")
                .with_channels(2)
                .with_title("Director's Commentary"),
            TrackInfo::new(3, TrackType::Subtitle, "subrip")
                .with_language("fre")
                .with_forced(true),
        ]
    }

    fn with_facts<R>(f: impl FnOnce(&EvaluationFacts<'_>) -> R) -> R {
        let tracks = tracks();
        let results = BTreeMap::new();
        let commentary = CommentaryMatcher::default();
        f(&EvaluationFacts::new(&tracks, &results, &commentary))
    }

    #[test]
    fn exists_matches_language() {
        with_facts(|facts| {
            let cond =
                Condition::exists(TrackType::Audio, TrackFilters::default().language(&["eng"]));
            let (result, reason) = evaluate_with_reason(&cond, facts);
            assert!(result);
            assert_eq!(reason, "exists(audio) -> true (track[1] eac3 eng)");
        });
    }

    #[test]
    fn not_exists_for_missing_language() {
        with_facts(|facts| {
            let cond = Condition::negate(Condition::exists(
                TrackType::Audio,
                TrackFilters::default().language(&["jpn"]),
            ));
            assert!(evaluate(&cond, facts));
        });
    }

    #[test]
    fn filters_combine() {
        with_facts(|facts| {
            let surround = TrackFilters::default()
                .codec(&["EAC3"])
                .channels(NumericMatch::Range(Comparison::gte(6)));
            assert!(evaluate(&Condition::exists(TrackType::Audio, surround), facts));

            let stereo_not_commentary = TrackFilters::default()
                .channels(NumericMatch::Exact(2))
                .excluding_commentary();
            assert!(!evaluate(
                &Condition::exists(TrackType::Audio, stereo_not_commentary),
                facts
            ));
        });
    }

    #[test]
    fn title_regex_and_contains() {
        with_facts(|facts| {
            let mut filters = TrackFilters::default();
            filters.title = Some(TitleMatch::Pattern(TitlePattern {
                contains: None,
                regex: Some("^director".to_string()),
            }));
            assert!(evaluate(&Condition::exists(TrackType::Audio, filters), facts));

            let mut filters = TrackFilters::default();
            filters.title = Some(TitleMatch::Contains("COMMENT".to_string()));
            assert!(evaluate(&Condition::exists(TrackType::Audio, filters), facts));
        });
    }

    #[test]
    fn count_compares_matches() {
        with_facts(|facts| {
            let cond = Condition::Count(CountCondition {
                query: TrackQuery {
                    track_type: TrackType::Audio,
                    filters: TrackFilters::default(),
                },
                operator: CompareOp::Gte,
                value: 2,
            });
            let (result, reason) = evaluate_with_reason(&cond, facts);
            assert!(result);
            assert_eq!(reason, "count(audio) = 2 >= 2 -> true");
        });
    }

    #[test]
    fn and_short_circuits_on_false() {
        with_facts(|facts| {
            let cond = Condition::And(vec![
                Condition::exists(TrackType::Audio, TrackFilters::default().language(&["jpn"])),
                Condition::exists(TrackType::Video, TrackFilters::default()),
            ]);
            let (result, reason) = evaluate_with_reason(&cond, facts);
            assert!(!result);
            assert!(reason.contains("exists(audio) -> false"));
        });
    }

    #[test]
    fn or_short_circuits_on_true() {
        with_facts(|facts| {
            let cond = Condition::Or(vec![
                Condition::exists(TrackType::Video, TrackFilters::default()),
                Condition::exists(TrackType::Attachment, TrackFilters::default()),
            ]);
            let (result, reason) = evaluate_with_reason(&cond, facts);
            assert!(result);
            assert!(reason.contains("exists(video)"));
        });
    }

    #[test]
    fn multi_language_uses_threshold() {
        let tracks = tracks();
        let commentary = CommentaryMatcher::default();
        let mut results = BTreeMap::new();
        results.insert(
            1,
            MultiLanguageDetectionResult {
                track_index: 1,
                primary_language: "eng".to_string(),
                primary_percentage: 0.80,
                secondary_languages: vec![],
                segments: vec![],
                classification: LanguageClassification::MultiLanguage,
                speech_ratio: 1.0,
            },
        );
        let facts = EvaluationFacts::new(&tracks, &results, &commentary);

        let loose = Condition::AudioIsMultiLanguage(MultiLanguageCondition::default());
        assert!(evaluate(&loose, &facts));

        let strict = Condition::AudioIsMultiLanguage(MultiLanguageCondition {
            threshold: 0.25,
            ..MultiLanguageCondition::default()
        });
        assert!(!evaluate(&strict, &facts));

        let other_track = Condition::AudioIsMultiLanguage(MultiLanguageCondition {
            track_index: Some(2),
            ..MultiLanguageCondition::default()
        });
        assert!(!evaluate(&other_track, &facts));
    }

    #[test]
    fn evaluation_is_deterministic() {
        with_facts(|facts| {
            let cond = Condition::exists(TrackType::Subtitle, TrackFilters::default().forced(true));
            assert_eq!(evaluate_with_reason(&cond, facts), evaluate_with_reason(&cond, facts));
        });
    }
}
