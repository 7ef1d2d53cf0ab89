//! Data models shared by every engine.
//!
//! - Enums for track types, flag types and container formats
//! - Track and file facts as reported by introspection
//! - Skip flags and flag changes accumulated during evaluation
//! - Language code comparison, codec aliases and commentary detection

mod codecs;
mod commentary;
mod enums;
mod flags;
mod language_codes;
mod media;

pub use codecs::{canonical_codec, codec_in, codecs_match, is_bitmap_subtitle};
pub use commentary::{CommentaryMatcher, DEFAULT_COMMENTARY_PATTERNS};
pub use enums::{normalize_container_format, ContainerFormat, FlagType, TrackType};
pub use flags::{SkipFlags, SkipType, TrackFlagChange};
pub use language_codes::{language_in, languages_match, normalize_language};
pub use media::{FileInfo, FrameRate, TrackInfo};
