//! Commentary track detection from title patterns.

use regex::{Regex, RegexBuilder};

use super::media::TrackInfo;

/// Patterns used when a policy does not configure its own.
pub const DEFAULT_COMMENTARY_PATTERNS: &[&str] = &["commentary", "director"];

/// Compiled case-insensitive title patterns.
#[derive(Debug, Clone)]
pub struct CommentaryMatcher {
    patterns: Vec<Regex>,
}

impl CommentaryMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, regex::Error> {
        let patterns = patterns
            .iter()
            .map(|p| RegexBuilder::new(p.as_ref()).case_insensitive(true).build())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// Matcher that never reports commentary.
    pub fn empty() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    pub fn is_commentary(&self, track: &TrackInfo) -> bool {
        match track.title.as_deref() {
            Some(title) => self.patterns.iter().any(|p| p.is_match(title)),
            None => false,
        }
    }
}

impl Default for CommentaryMatcher {
    fn default() -> Self {
        Self::new(DEFAULT_COMMENTARY_PATTERNS).unwrap_or_else(|_| Self::empty())
    }
}
