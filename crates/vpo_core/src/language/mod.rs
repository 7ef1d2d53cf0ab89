//! Multi-language detection for audio tracks.
//!
//! Backends report per-sample languages through [`TranscriptionPlugin`];
//! [`MultiLanguageAggregator`] turns those into a per-track classification
//! that conditions such as `audio_is_multi_language` consume.

mod aggregator;
mod plugin;
mod types;

pub use aggregator::{sample_positions, MultiLanguageAggregator};
pub use plugin::{AudioSample, PluginFeature, TranscriptionError, TranscriptionPlugin};
pub use types::{
    LanguageClassification, LanguageError, LanguagePercentage, LanguageSegment,
    MultiLanguageDetectionResult, MultiSampleConfig, SampleDetection, VoteOutcome,
    SINGLE_LANGUAGE_THRESHOLD,
};
