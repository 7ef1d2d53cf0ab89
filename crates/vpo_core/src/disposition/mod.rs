//! Track disposition: language filters with minimum-count fallback.

mod engine;
mod fallback;
mod types;

pub use engine::TrackDispositionEngine;
pub use types::{
    AttachmentFilterConfig, AudioFilterConfig, DispositionAction, DispositionPlan, FallbackConfig,
    FallbackMode, SubtitleFilterConfig, TrackDisposition,
};
