//! Aggregation of sampled language detections into per-track verdicts.

use crate::models::{languages_match, normalize_language};

use super::types::{
    LanguageClassification, LanguagePercentage, LanguageSegment, MultiLanguageDetectionResult,
    MultiSampleConfig, SampleDetection, VoteOutcome,
};

/// Turns language segments into a [`MultiLanguageDetectionResult`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MultiLanguageAggregator;

impl MultiLanguageAggregator {
    /// Aggregate segments for one track.
    ///
    /// Durations are summed per language; the language with the largest total
    /// is primary, ties going to the language that appears first. Returns
    /// `None` when there is no speech to classify.
    pub fn aggregate(
        &self,
        track_index: usize,
        segments: &[LanguageSegment],
        speech_ratio: f64,
    ) -> Option<MultiLanguageDetectionResult> {
        // (language, total duration) in order of first appearance
        let mut totals: Vec<(String, f64)> = Vec::new();
        for segment in segments {
            let code = normalize_language(&segment.language_code);
            match totals.iter_mut().find(|(lang, _)| *lang == code) {
                Some((_, total)) => *total += segment.duration(),
                None => totals.push((code, segment.duration())),
            }
        }

        let total: f64 = totals.iter().map(|(_, d)| d).sum();
        if totals.is_empty() || total <= 0.0 {
            return None;
        }

        let mut primary = 0;
        for (i, (_, duration)) in totals.iter().enumerate() {
            if *duration > totals[primary].1 {
                primary = i;
            }
        }

        let (primary_language, primary_duration) = totals[primary].clone();
        let primary_percentage = primary_duration / total;

        let mut secondary_languages: Vec<LanguagePercentage> = totals
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != primary)
            .map(|(_, (lang, duration))| LanguagePercentage {
                language_code: lang.clone(),
                percentage: duration / total,
            })
            .collect();
        secondary_languages.sort_by(|a, b| b.percentage.total_cmp(&a.percentage));

        let classification = LanguageClassification::from_primary_percentage(primary_percentage);
        tracing::debug!(
            track_index,
            primary = %primary_language,
            primary_percentage,
            %classification,
            "Aggregated language segments"
        );

        Some(MultiLanguageDetectionResult {
            track_index,
            primary_language,
            primary_percentage,
            secondary_languages,
            segments: segments.to_vec(),
            classification,
            speech_ratio: speech_ratio.clamp(0.0, 1.0),
        })
    }

    /// Confidence-weighted vote across samples.
    ///
    /// The track's current language tag gets `incumbent_bonus` extra weight
    /// when at least one sample voted for it.
    pub fn vote(
        &self,
        detections: &[SampleDetection],
        incumbent_language: Option<&str>,
        incumbent_bonus: f64,
    ) -> Option<VoteOutcome> {
        let mut votes: Vec<(String, f64)> = Vec::new();
        for detection in detections {
            let Some(language) = detection.language.as_deref() else {
                continue;
            };
            let code = normalize_language(language);
            match votes.iter_mut().find(|(lang, _)| *lang == code) {
                Some((_, weight)) => *weight += detection.confidence,
                None => votes.push((code, detection.confidence)),
            }
        }

        if let Some(incumbent) = incumbent_language {
            if let Some((_, weight)) = votes
                .iter_mut()
                .find(|(lang, _)| languages_match(lang, incumbent))
            {
                *weight += incumbent_bonus;
            }
        }

        let mut winner: Option<&(String, f64)> = None;
        for entry in &votes {
            if winner.is_none_or(|w| entry.1 > w.1) {
                winner = Some(entry);
            }
        }
        let (language, _) = winner?;

        let confidences: Vec<f64> = detections
            .iter()
            .filter(|d| d.language.as_deref().is_some_and(|l| languages_match(l, language)))
            .map(|d| d.confidence)
            .collect();
        let confidence = confidences.iter().sum::<f64>() / confidences.len() as f64;

        Some(VoteOutcome {
            language: language.clone(),
            confidence,
            samples_taken: detections.len(),
        })
    }
}

/// Sample start positions for a track, in priority order.
///
/// Start, middle, first quarter and third quarter come first so callers can
/// stop early; further samples are spread evenly. Positions never run past
/// the end of the track.
pub fn sample_positions(track_duration: Option<f64>, config: &MultiSampleConfig) -> Vec<f64> {
    if config.max_samples == 0 {
        return Vec::new();
    }

    let floor = config.min_sample_position.max(0.0);
    let duration = track_duration.unwrap_or(0.0);
    let max_start = (duration - config.sample_duration).max(0.0);
    if max_start <= floor || config.max_samples == 1 {
        return vec![if max_start > floor { floor } else { 0.0 }];
    }

    let span = max_start - floor;
    let mut positions: Vec<f64> = [0.0, 0.5, 0.25, 0.75]
        .iter()
        .take(config.max_samples)
        .map(|fraction| floor + span * fraction)
        .collect();

    for i in 4..config.max_samples {
        let pos = floor + span * (i as f64 / config.max_samples as f64);
        if !positions.iter().any(|p| (p - pos).abs() < 1.0) {
            positions.push(pos);
        }
    }

    positions.truncate(config.max_samples);
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(lang: &str, start: f64, end: f64) -> LanguageSegment {
        LanguageSegment::new(lang, start, end, 0.9).unwrap()
    }

    #[test]
    fn single_language_track() {
        let result = MultiLanguageAggregator
            .aggregate(1, &[seg("eng", 0.0, 97.0), seg("fre", 97.0, 100.0)], 1.0)
            .unwrap();
        assert_eq!(result.primary_language, "eng");
        assert!((result.primary_percentage - 0.97).abs() < 1e-9);
        assert_eq!(result.classification, LanguageClassification::SingleLanguage);
        assert_eq!(result.secondary_languages[0].language_code, "fre");
    }

    #[test]
    fn multi_language_track() {
        let result = MultiLanguageAggregator
            .aggregate(
                2,
                &[seg("eng", 0.0, 60.0), seg("jpn", 60.0, 90.0), seg("eng", 90.0, 100.0)],
                0.8,
            )
            .unwrap();
        assert_eq!(result.primary_language, "eng");
        assert!((result.primary_percentage - 0.7).abs() < 1e-9);
        assert!(result.is_multi_language());
        let jpn = &result.secondary_languages[0];
        assert_eq!(jpn.language_code, "jpn");
        assert!((jpn.percentage - 0.3).abs() < 1e-9);
    }

    #[test]
    fn tie_goes_to_first_language_seen() {
        let result = MultiLanguageAggregator
            .aggregate(0, &[seg("spa", 0.0, 50.0), seg("eng", 50.0, 100.0)], 1.0)
            .unwrap();
        assert_eq!(result.primary_language, "spa");
    }

    #[test]
    fn variant_codes_are_merged() {
        let result = MultiLanguageAggregator
            .aggregate(0, &[seg("fra", 0.0, 50.0), seg("fre", 50.0, 100.0)], 1.0)
            .unwrap();
        assert_eq!(result.primary_language, "fre");
        assert!((result.primary_percentage - 1.0).abs() < 1e-9);
    }

    #[test]
    fn no_segments_yields_none() {
        assert!(MultiLanguageAggregator.aggregate(0, &[], 0.0).is_none());
    }

    #[test]
    fn incumbent_bonus_breaks_close_votes() {
        let detections = vec![
            SampleDetection {
                language: Some("eng".into()),
                confidence: 0.6,
                has_speech: true,
            },
            SampleDetection {
                language: Some("ger".into()),
                confidence: 0.7,
                has_speech: true,
            },
        ];
        let without = MultiLanguageAggregator.vote(&detections, None, 0.15).unwrap();
        assert_eq!(without.language, "ger");

        let with = MultiLanguageAggregator
            .vote(&detections, Some("en"), 0.15)
            .unwrap();
        assert_eq!(with.language, "eng");
        assert!((with.confidence - 0.6).abs() < 1e-9);
        assert_eq!(with.samples_taken, 2);
    }

    #[test]
    fn positions_prioritise_start_and_middle() {
        let config = MultiSampleConfig {
            max_samples: 4,
            sample_duration: 30.0,
            ..MultiSampleConfig::default()
        };
        let positions = sample_positions(Some(630.0), &config);
        assert_eq!(positions, vec![0.0, 300.0, 150.0, 450.0]);
    }

    #[test]
    fn short_track_gets_one_sample() {
        let positions = sample_positions(Some(20.0), &MultiSampleConfig::default());
        assert_eq!(positions, vec![0.0]);
        assert_eq!(sample_positions(None, &MultiSampleConfig::default()), vec![0.0]);
    }

    #[test]
    fn extra_samples_spread_evenly() {
        let config = MultiSampleConfig {
            max_samples: 6,
            sample_duration: 0.0,
            ..MultiSampleConfig::default()
        };
        let positions = sample_positions(Some(600.0), &config);
        assert_eq!(positions.len(), 6);
        assert!(positions.iter().all(|p| *p <= 600.0));
    }
}
