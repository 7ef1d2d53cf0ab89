//! Language analysis types.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Share of speech the primary language must reach for a single-language verdict.
pub const SINGLE_LANGUAGE_THRESHOLD: f64 = 0.95;

/// Errors raised while building language analysis values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LanguageError {
    #[error("Segment end ({end}) must be after start ({start})")]
    InvalidSpan { start: f64, end: f64 },

    #[error("Segment confidence {0} is outside [0, 1]")]
    InvalidConfidence(f64),
}

/// A stretch of audio detected as one language.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguageSegment {
    pub language_code: String,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f64,
}

impl LanguageSegment {
    pub fn new(
        language_code: impl Into<String>,
        start_time: f64,
        end_time: f64,
        confidence: f64,
    ) -> Result<Self, LanguageError> {
        if end_time <= start_time {
            return Err(LanguageError::InvalidSpan {
                start: start_time,
                end: end_time,
            });
        }
        if !(0.0..=1.0).contains(&confidence) {
            return Err(LanguageError::InvalidConfidence(confidence));
        }
        Ok(Self {
            language_code: language_code.into(),
            start_time,
            end_time,
            confidence,
        })
    }

    pub fn duration(&self) -> f64 {
        self.end_time - self.start_time
    }
}

/// Verdict for one audio track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LanguageClassification {
    SingleLanguage,
    MultiLanguage,
}

impl LanguageClassification {
    pub fn from_primary_percentage(primary_percentage: f64) -> Self {
        if primary_percentage >= SINGLE_LANGUAGE_THRESHOLD {
            LanguageClassification::SingleLanguage
        } else {
            LanguageClassification::MultiLanguage
        }
    }
}

impl std::fmt::Display for LanguageClassification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LanguageClassification::SingleLanguage => write!(f, "SINGLE_LANGUAGE"),
            LanguageClassification::MultiLanguage => write!(f, "MULTI_LANGUAGE"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LanguagePercentage {
    pub language_code: String,
    pub percentage: f64,
}

/// Aggregated language analysis for one audio track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLanguageDetectionResult {
    pub track_index: usize,
    pub primary_language: String,
    /// Fraction of detected speech in the primary language, 0.0 to 1.0.
    pub primary_percentage: f64,
    /// Other languages, highest share first.
    #[serde(default)]
    pub secondary_languages: Vec<LanguagePercentage>,
    #[serde(default)]
    pub segments: Vec<LanguageSegment>,
    pub classification: LanguageClassification,
    /// Fraction of samples that contained speech.
    pub speech_ratio: f64,
}

impl MultiLanguageDetectionResult {
    pub fn is_multi_language(&self) -> bool {
        self.classification == LanguageClassification::MultiLanguage
    }
}

/// Single-sample detection returned by a transcription backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SampleDetection {
    pub language: Option<String>,
    pub confidence: f64,
    pub has_speech: bool,
}

/// Winner of a confidence-weighted vote across samples.
#[derive(Debug, Clone, PartialEq)]
pub struct VoteOutcome {
    pub language: String,
    /// Mean confidence of the samples that voted for the winner.
    pub confidence: f64,
    pub samples_taken: usize,
}

/// How many samples to take and how long each one is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiSampleConfig {
    pub max_samples: usize,
    /// Seconds per sample.
    pub sample_duration: f64,
    /// Earliest sample start, in seconds, to skip intros.
    pub min_sample_position: f64,
    pub confidence_threshold: f64,
    pub incumbent_bonus: f64,
}

impl Default for MultiSampleConfig {
    fn default() -> Self {
        Self {
            max_samples: 3,
            sample_duration: 30.0,
            min_sample_position: 0.0,
            confidence_threshold: 0.85,
            incumbent_bonus: 0.15,
        }
    }
}
