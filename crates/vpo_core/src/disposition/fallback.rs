//! Audio fallback strategies applied when the language filter keeps too few tracks.

use tracing::info;

use crate::models::{languages_match, normalize_language, TrackInfo, TrackType};
use crate::policy::{PolicyError, PolicyResult};

use super::types::{AudioFilterConfig, FallbackMode, TrackDisposition};

/// Rewrite audio dispositions according to the configured fallback.
///
/// Only called when at least one audio track exists and fewer than
/// `minimum` were kept.
pub(super) fn apply_audio_fallback(
    tracks: &[TrackInfo],
    dispositions: &mut [TrackDisposition],
    config: &AudioFilterConfig,
) -> PolicyResult<()> {
    let audio: Vec<&TrackInfo> = tracks
        .iter()
        .filter(|t| t.track_type == TrackType::Audio)
        .collect();
    let mode = config.fallback.map(|f| f.mode).unwrap_or(FallbackMode::Error);
    info!(%mode, audio_tracks = audio.len(), minimum = config.minimum, "Applying audio fallback");

    match mode {
        FallbackMode::KeepAll => {
            for d in audio_dispositions(dispositions) {
                *d = TrackDisposition::keep(d.track_index, TrackType::Audio, "fallback: keep_all");
            }
        }
        FallbackMode::KeepFirst => {
            let first = audio.iter().map(|t| t.index).min();
            for d in audio_dispositions(dispositions) {
                *d = if Some(d.track_index) == first {
                    TrackDisposition::keep(d.track_index, TrackType::Audio, "fallback: keep_first")
                } else {
                    TrackDisposition::remove(
                        d.track_index,
                        TrackType::Audio,
                        "fallback: keep_first (not first audio track)",
                    )
                };
            }
        }
        FallbackMode::ContentLanguage => {
            let Some(language) = most_common_language(&audio) else {
                return Err(insufficient(&audio, dispositions, config));
            };
            let reason = format!("fallback: content_language ({})", language);
            for d in audio_dispositions(dispositions) {
                let matches = tracks
                    .iter()
                    .find(|t| t.index == d.track_index)
                    .is_some_and(|t| languages_match(&t.language, &language));
                *d = if matches {
                    TrackDisposition::keep(d.track_index, TrackType::Audio, reason.clone())
                } else {
                    TrackDisposition::remove(
                        d.track_index,
                        TrackType::Audio,
                        format!("fallback: content_language (not {})", language),
                    )
                };
            }
        }
        FallbackMode::Error => return Err(insufficient(&audio, dispositions, config)),
    }

    Ok(())
}

fn audio_dispositions(
    dispositions: &mut [TrackDisposition],
) -> impl Iterator<Item = &mut TrackDisposition> {
    dispositions
        .iter_mut()
        .filter(|d| d.track_type == TrackType::Audio)
}

/// Most frequent language among the audio tracks.
///
/// Ties go to the language whose first track has the lowest index.
fn most_common_language(audio: &[&TrackInfo]) -> Option<String> {
    let mut ordered: Vec<&&TrackInfo> = audio.iter().collect();
    ordered.sort_by_key(|t| t.index);

    let mut counts: Vec<(String, usize)> = Vec::new();
    for track in ordered {
        let code = normalize_language(&track.language);
        match counts.iter_mut().find(|(lang, _)| *lang == code) {
            Some((_, count)) => *count += 1,
            None => counts.push((code, 1)),
        }
    }

    let mut best: Option<&(String, usize)> = None;
    for entry in &counts {
        if best.is_none_or(|b| entry.1 > b.1) {
            best = Some(entry);
        }
    }
    best.map(|(lang, _)| lang.clone())
}

fn insufficient(
    audio: &[&TrackInfo],
    dispositions: &[TrackDisposition],
    config: &AudioFilterConfig,
) -> PolicyError {
    let mut file_languages: Vec<String> = Vec::new();
    for track in audio {
        if !file_languages.iter().any(|l| languages_match(l, &track.language)) {
            file_languages.push(track.language.clone());
        }
    }
    PolicyError::InsufficientTracks {
        track_type: TrackType::Audio,
        minimum: config.minimum,
        available: dispositions
            .iter()
            .filter(|d| d.track_type == TrackType::Audio && d.is_keep())
            .count(),
        policy_languages: config.languages.clone(),
        file_languages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn most_common_prefers_earliest_on_tie() {
        let tracks = [
            TrackInfo::new(1, TrackType::Audio, "aac").with_language("spa"),
            TrackInfo::new(2, TrackType::Audio, "aac").with_language("fre"),
            TrackInfo::new(3, TrackType::Audio, "aac").with_language("fre"),
            TrackInfo::new(4, TrackType::Audio, "aac").with_language("spa"),
        ];
        let refs: Vec<&TrackInfo> = tracks.iter().collect();
        assert_eq!(most_common_language(&refs).as_deref(), Some("spa"));
    }

    #[test]
    fn most_common_counts_variants_together() {
        let tracks = [
            TrackInfo::new(1, TrackType::Audio, "aac").with_language("spa"),
            TrackInfo::new(2, TrackType::Audio, "aac").with_language("fra"),
            TrackInfo::new(3, TrackType::Audio, "aac").with_language("fre"),
        ];
        let refs: Vec<&TrackInfo> = tracks.iter().collect();
        assert_eq!(most_common_language(&refs).as_deref(), Some("fre"));
    }
}
