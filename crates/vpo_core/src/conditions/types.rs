//! Predicate tree and track filter types.

use serde::{Deserialize, Serialize};

use crate::models::TrackType;

/// Default share below which a secondary language is ignored.
pub const DEFAULT_MULTI_LANGUAGE_THRESHOLD: f64 = 0.05;

/// A predicate over the facts of one file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    /// At least one track of the type matches the filters.
    Exists(TrackQuery),
    /// Number of matching tracks compared against a value.
    Count(CountCondition),
    Not(Box<Condition>),
    /// All sub-conditions hold. Requires at least two.
    And(Vec<Condition>),
    /// Any sub-condition holds. Requires at least two.
    Or(Vec<Condition>),
    AudioIsMultiLanguage(MultiLanguageCondition),
}

impl Condition {
    pub fn exists(track_type: TrackType, filters: TrackFilters) -> Self {
        Condition::Exists(TrackQuery {
            track_type,
            filters,
        })
    }

    pub fn negate(inner: Condition) -> Self {
        Condition::Not(Box::new(inner))
    }
}

/// Track type plus filters, shared by `exists` and `count`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackQuery {
    pub track_type: TrackType,
    #[serde(default)]
    pub filters: TrackFilters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountCondition {
    #[serde(flatten)]
    pub query: TrackQuery,
    pub operator: CompareOp,
    pub value: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompareOp {
    Eq,
    Lt,
    Lte,
    Gt,
    Gte,
}

impl CompareOp {
    pub fn apply(&self, actual: u32, expected: u32) -> bool {
        match self {
            CompareOp::Eq => actual == expected,
            CompareOp::Lt => actual < expected,
            CompareOp::Lte => actual <= expected,
            CompareOp::Gt => actual > expected,
            CompareOp::Gte => actual >= expected,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Lt => "<",
            CompareOp::Lte => "<=",
            CompareOp::Gt => ">",
            CompareOp::Gte => ">=",
        }
    }
}

/// `audio_is_multi_language` parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiLanguageCondition {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    /// Restrict the check to one audio track.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub track_index: Option<usize>,
    /// Require this primary language as well.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_language: Option<String>,
}

fn default_threshold() -> f64 {
    DEFAULT_MULTI_LANGUAGE_THRESHOLD
}

impl Default for MultiLanguageCondition {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_MULTI_LANGUAGE_THRESHOLD,
            track_index: None,
            primary_language: None,
        }
    }
}

/// Per-track filters; every field that is set must match.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TrackFilters {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub codec: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_default: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_forced: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub channels: Option<NumericMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<NumericMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<NumericMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<TitleMatch>,
    #[serde(default)]
    pub not_commentary: bool,
}

impl TrackFilters {
    pub fn language(mut self, languages: &[&str]) -> Self {
        self.language = Some(languages.iter().map(|l| l.to_string()).collect());
        self
    }

    pub fn codec(mut self, codecs: &[&str]) -> Self {
        self.codec = Some(codecs.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn channels(mut self, channels: NumericMatch) -> Self {
        self.channels = Some(channels);
        self
    }

    pub fn forced(mut self, is_forced: bool) -> Self {
        self.is_forced = Some(is_forced);
        self
    }

    pub fn default_flag(mut self, is_default: bool) -> Self {
        self.is_default = Some(is_default);
        self
    }

    pub fn excluding_commentary(mut self) -> Self {
        self.not_commentary = true;
        self
    }
}

/// Integer match: exact value or bounded comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericMatch {
    Exact(u32),
    Range(Comparison),
}

impl NumericMatch {
    /// Unknown values never match.
    pub fn matches(&self, value: Option<u32>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            NumericMatch::Exact(expected) => value == *expected,
            NumericMatch::Range(cmp) => cmp.matches(value),
        }
    }
}

/// Bounds AND-combined; at least one should be set.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comparison {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eq: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<u32>,
}

impl Comparison {
    pub fn gte(value: u32) -> Self {
        Self {
            gte: Some(value),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.eq.is_none()
            && self.lt.is_none()
            && self.lte.is_none()
            && self.gt.is_none()
            && self.gte.is_none()
    }

    pub fn matches(&self, value: u32) -> bool {
        self.eq.is_none_or(|v| value == v)
            && self.lt.is_none_or(|v| value < v)
            && self.lte.is_none_or(|v| value <= v)
            && self.gt.is_none_or(|v| value > v)
            && self.gte.is_none_or(|v| value >= v)
    }
}

/// Title match: plain substring or explicit `contains` / `regex`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TitleMatch {
    Contains(String),
    Pattern(TitlePattern),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitlePattern {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contains: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
}
