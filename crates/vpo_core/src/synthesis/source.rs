//! Source track selection for synthesized audio.

use crate::models::{codec_in, language_in, CommentaryMatcher, TrackInfo};

use super::types::{ChannelKeyword, ChannelMatch, SourcePreference};

/// True if `track` satisfies a channel criterion relative to `pool`.
pub(super) fn channels_match(
    track: &TrackInfo,
    criterion: &ChannelMatch,
    pool: &[&TrackInfo],
) -> bool {
    let Some(channels) = track.channels else {
        return false;
    };
    match criterion {
        ChannelMatch::Exact(n) => channels == *n,
        ChannelMatch::Range(cmp) => cmp.matches(channels),
        ChannelMatch::Relative(ChannelKeyword::Max) => {
            pool.iter().filter_map(|t| t.channels).max() == Some(channels)
        }
        ChannelMatch::Relative(ChannelKeyword::Min) => {
            pool.iter().filter_map(|t| t.channels).min() == Some(channels)
        }
    }
}

fn satisfies(
    track: &TrackInfo,
    preference: &SourcePreference,
    pool: &[&TrackInfo],
    commentary: &CommentaryMatcher,
) -> bool {
    match preference {
        SourcePreference::Language(languages) => language_in(&track.language, languages),
        SourcePreference::NotCommentary => !commentary.is_commentary(track),
        SourcePreference::Codec(codecs) => codec_in(&track.codec, codecs),
        SourcePreference::Channels(criterion) => channels_match(track, criterion, pool),
    }
}

/// Pick the source track for a synthesis rule.
///
/// Each preference narrows the candidate set in turn; selection stops as
/// soon as exactly one candidate remains. A preference that would leave no
/// candidates is ignored. When the list is exhausted the candidate with the
/// most channels wins, ties going to the lowest index.
pub fn select_source<'a>(
    audio: &[&'a TrackInfo],
    preferences: &[SourcePreference],
    commentary: &CommentaryMatcher,
) -> Option<&'a TrackInfo> {
    let mut candidates: Vec<&'a TrackInfo> = audio.to_vec();
    if candidates.len() <= 1 {
        return candidates.first().copied();
    }

    for preference in preferences {
        let narrowed: Vec<&'a TrackInfo> = candidates
            .iter()
            .copied()
            .filter(|t| satisfies(t, preference, &candidates, commentary))
            .collect();
        match narrowed.len() {
            0 => continue,
            1 => return narrowed.first().copied(),
            _ => candidates = narrowed,
        }
    }

    let mut best: Option<&'a TrackInfo> = None;
    for track in candidates {
        let channels = track.channels.unwrap_or(0);
        let better = match best {
            None => true,
            Some(b) => {
                let best_channels = b.channels.unwrap_or(0);
                channels > best_channels || (channels == best_channels && track.index < b.index)
            }
        };
        if better {
            best = Some(track);
        }
    }
    best
}
