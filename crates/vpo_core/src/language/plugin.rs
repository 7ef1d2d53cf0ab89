//! Capability interface for transcription backends.

use std::path::PathBuf;

use thiserror::Error;

use super::aggregator::MultiLanguageAggregator;
use super::types::{LanguageError, LanguageSegment, MultiLanguageDetectionResult, SampleDetection};

/// Optional capabilities a backend may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginFeature {
    LanguageDetection,
    MultiLanguageDetection,
    Transcription,
}

/// An extracted audio excerpt handed to a backend.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSample {
    pub track_index: usize,
    pub start_time: f64,
    pub duration: f64,
    /// Location of the extracted excerpt.
    pub path: PathBuf,
}

#[derive(Error, Debug)]
pub enum TranscriptionError {
    #[error("Plugin '{plugin}' does not support {feature:?}")]
    Unsupported {
        plugin: String,
        feature: PluginFeature,
    },

    #[error("No speech detected in {samples} sample(s)")]
    NoSpeechDetected { samples: usize },

    #[error("Invalid segment from backend: {0}")]
    InvalidSegment(#[from] LanguageError),

    #[error("Transcription backend failed: {0}")]
    Backend(String),
}

impl TranscriptionError {
    pub fn backend(message: impl Into<String>) -> Self {
        TranscriptionError::Backend(message.into())
    }
}

/// A transcription backend injected into the phase executor.
///
/// Implementors provide `detect_language`; the provided
/// `detect_multi_language` turns per-sample detections into segments and
/// aggregates them.
pub trait TranscriptionPlugin: Send + Sync {
    fn name(&self) -> &str;

    fn supports(&self, feature: PluginFeature) -> bool;

    /// Detect the spoken language of one sample.
    fn detect_language(&self, sample: &AudioSample) -> Result<SampleDetection, TranscriptionError>;

    fn detect_multi_language(
        &self,
        samples: &[AudioSample],
    ) -> Result<MultiLanguageDetectionResult, TranscriptionError> {
        let track_index = samples.first().map(|s| s.track_index).unwrap_or_default();
        let mut segments = Vec::new();
        let mut with_speech = 0usize;

        for sample in samples {
            let detection = self.detect_language(sample)?;
            if !detection.has_speech {
                continue;
            }
            with_speech += 1;
            if let Some(language) = detection.language {
                segments.push(LanguageSegment::new(
                    language,
                    sample.start_time,
                    sample.start_time + sample.duration,
                    detection.confidence.clamp(0.0, 1.0),
                )?);
            }
        }

        let speech_ratio = if samples.is_empty() {
            0.0
        } else {
            with_speech as f64 / samples.len() as f64
        };

        MultiLanguageAggregator
            .aggregate(track_index, &segments, speech_ratio)
            .ok_or(TranscriptionError::NoSpeechDetected {
                samples: samples.len(),
            })
    }
}
