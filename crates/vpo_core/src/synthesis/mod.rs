//! Audio synthesis: planning new audio tracks derived from existing ones.

mod planner;
mod source;
mod types;

pub use planner::{default_bitrate, AudioSynthesisPlanner};
pub use source::select_source;
pub use types::{
    AudioSynthesisConfig, ChannelKeyword, ChannelLayout, ChannelMatch, Downmix, Inherited,
    SkipIfExists, SkippedSynthesis, SourcePreference, SynthesisCodec, SynthesisOperation,
    SynthesisPlan, SynthesisRule, SynthesisSkipReason, TrackPosition,
};
