//! Track edits and how they change the in-memory view of a file.
//!
//! Every mutating operation hands its edits to a tool and then projects the
//! same edits onto the track list, so the next operation in the phase sees
//! the file as introspection would report it.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::models::{FlagType, TrackInfo, TrackType};

use super::types::ExecutionState;

/// One change to a file's track layout.
///
/// Indices refer to the track list before the request is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "edit", rename_all = "snake_case")]
pub enum TrackEdit {
    Remove {
        track_index: usize,
    },
    SetFlag {
        track_index: usize,
        flag: FlagType,
        value: bool,
    },
    SetLanguage {
        track_index: usize,
        language: String,
    },
    ConvertCodec {
        track_index: usize,
        codec: String,
    },
    Resize {
        track_index: usize,
        width: u32,
        height: u32,
    },
    /// New track order, as a permutation of the current indices.
    Reorder {
        order: Vec<usize>,
    },
    /// Insert a new audio track at a 0-based audio position.
    Insert {
        audio_position: usize,
        track: TrackInfo,
    },
}

impl TrackEdit {
    pub fn describe(&self) -> String {
        match self {
            TrackEdit::Remove { track_index } => format!("remove track {}", track_index),
            TrackEdit::SetFlag {
                track_index,
                flag,
                value,
            } => format!("set {} {} on track {}", flag, value, track_index),
            TrackEdit::SetLanguage {
                track_index,
                language,
            } => format!("set language {} on track {}", language, track_index),
            TrackEdit::ConvertCodec { track_index, codec } => {
                format!("convert track {} to {}", track_index, codec)
            }
            TrackEdit::Resize {
                track_index,
                width,
                height,
            } => format!("scale track {} to {}x{}", track_index, width, height),
            TrackEdit::Reorder { order } => format!("reorder tracks {:?}", order),
            TrackEdit::Insert {
                audio_position,
                track,
            } => format!(
                "insert {} {} at audio position {}",
                track.codec, track.language, audio_position
            ),
        }
    }
}

/// Apply edits to the state's track list, then renumber.
///
/// In-place edits go first, then removals, then a reorder, then inserts.
/// Language results follow their tracks to the new indices.
pub fn project(state: &mut ExecutionState, edits: &[TrackEdit]) {
    // (original index, track); inserted tracks have no original index
    let mut slots: Vec<(Option<usize>, TrackInfo)> = state
        .file_info
        .tracks
        .iter()
        .map(|t| (Some(t.index), t.clone()))
        .collect();

    for edit in edits {
        match edit {
            TrackEdit::SetFlag {
                track_index,
                flag,
                value,
            } => {
                if let Some(track) = slot_mut(&mut slots, *track_index) {
                    match flag {
                        FlagType::Default => track.is_default = *value,
                        FlagType::Forced => track.is_forced = *value,
                    }
                }
            }
            TrackEdit::SetLanguage {
                track_index,
                language,
            } => {
                if let Some(track) = slot_mut(&mut slots, *track_index) {
                    track.language = language.clone();
                }
            }
            TrackEdit::ConvertCodec { track_index, codec } => {
                if let Some(track) = slot_mut(&mut slots, *track_index) {
                    track.codec = codec.clone();
                    track.bitrate = None;
                }
            }
            TrackEdit::Resize {
                track_index,
                width,
                height,
            } => {
                if let Some(track) = slot_mut(&mut slots, *track_index) {
                    track.width = Some(*width);
                    track.height = Some(*height);
                }
            }
            _ => {}
        }
    }

    let removed: Vec<usize> = edits
        .iter()
        .filter_map(|e| match e {
            TrackEdit::Remove { track_index } => Some(*track_index),
            _ => None,
        })
        .collect();
    slots.retain(|(origin, _)| origin.is_none_or(|i| !removed.contains(&i)));

    if let Some(order) = edits.iter().rev().find_map(|e| match e {
        TrackEdit::Reorder { order } => Some(order),
        _ => None,
    }) {
        let rank = |origin: Option<usize>| {
            origin
                .and_then(|i| order.iter().position(|o| *o == i))
                .unwrap_or(usize::MAX)
        };
        slots.sort_by_key(|(origin, _)| rank(*origin));
    }

    for edit in edits {
        if let TrackEdit::Insert {
            audio_position,
            track,
        } = edit
        {
            let at = insert_position(&slots, *audio_position);
            slots.insert(at, (None, track.clone()));
        }
    }

    let mut moved = BTreeMap::new();
    for (new_index, (origin, _)) in slots.iter().enumerate() {
        if let Some(old) = origin {
            if let Some(mut result) = state.language_results.remove(old) {
                result.track_index = new_index;
                moved.insert(new_index, result);
            }
        }
    }
    state.language_results = moved;

    state.file_info.tracks = slots.into_iter().map(|(_, t)| t).collect();
    state.file_info.renumber();
}

fn slot_mut(slots: &mut [(Option<usize>, TrackInfo)], index: usize) -> Option<&mut TrackInfo> {
    slots
        .iter_mut()
        .find(|(origin, _)| *origin == Some(index))
        .map(|(_, track)| track)
}

/// Overall list position for a new track at `audio_position` among audio tracks.
fn insert_position(slots: &[(Option<usize>, TrackInfo)], audio_position: usize) -> usize {
    let audio: Vec<usize> = slots
        .iter()
        .enumerate()
        .filter(|(_, (_, t))| t.track_type == TrackType::Audio)
        .map(|(i, _)| i)
        .collect();

    if let Some(at) = audio.get(audio_position) {
        return *at;
    }
    if let Some(last) = audio.last() {
        return last + 1;
    }
    slots
        .iter()
        .rposition(|(_, t)| t.track_type == TrackType::Video)
        .map_or(slots.len(), |i| i + 1)
}
