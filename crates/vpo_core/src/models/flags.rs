//! Skip flags and track flag changes accumulated while evaluating a file.

use serde::{Deserialize, Serialize};

use super::enums::FlagType;

/// Kind of processing a conditional `skip` action suppresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipType {
    VideoTranscode,
    AudioTranscode,
    TrackFilter,
}

/// Flags accumulated for one file. Fields only ever go from false to true.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkipFlags {
    pub skip_video_transcode: bool,
    pub skip_audio_transcode: bool,
    pub skip_track_filter: bool,
}

impl SkipFlags {
    /// Return a copy with the given skip set.
    #[must_use]
    pub fn with(mut self, skip: SkipType) -> Self {
        match skip {
            SkipType::VideoTranscode => self.skip_video_transcode = true,
            SkipType::AudioTranscode => self.skip_audio_transcode = true,
            SkipType::TrackFilter => self.skip_track_filter = true,
        }
        self
    }

    /// OR-combine two flag sets.
    #[must_use]
    pub fn merge(self, other: SkipFlags) -> Self {
        Self {
            skip_video_transcode: self.skip_video_transcode || other.skip_video_transcode,
            skip_audio_transcode: self.skip_audio_transcode || other.skip_audio_transcode,
            skip_track_filter: self.skip_track_filter || other.skip_track_filter,
        }
    }

    pub fn is_empty(&self) -> bool {
        !(self.skip_video_transcode || self.skip_audio_transcode || self.skip_track_filter)
    }
}

/// A requested change to a track's default or forced flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackFlagChange {
    pub track_index: usize,
    pub flag: FlagType,
    pub value: bool,
}
