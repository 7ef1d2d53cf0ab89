//! Codec name aliases as reported by different introspection tools.

const VIDEO_ALIASES: &[(&str, &[&str])] = &[
    ("hevc", &["hevc", "h265", "h.265", "x265", "hvc1", "hev1"]),
    ("h264", &["h264", "h.264", "avc", "avc1", "x264"]),
    ("vp9", &["vp9", "vp09"]),
    ("av1", &["av1", "av01", "libaom-av1"]),
    ("mpeg4", &["mpeg4", "mp4v"]),
];

const AUDIO_ALIASES: &[(&str, &[&str])] = &[
    ("truehd", &["truehd", "dolby truehd", "mlp"]),
    ("dts-hd", &["dts-hd ma", "dts-hd", "dtshd", "dts_hd", "dts-hd.ma"]),
    ("dts", &["dts", "dca"]),
    ("flac", &["flac"]),
    ("pcm", &["pcm_s16le", "pcm_s24le", "pcm_s32le", "pcm_f32le", "pcm"]),
    ("aac", &["aac", "aac_latm", "mp4a"]),
    ("ac3", &["ac3", "ac-3", "a52"]),
    ("eac3", &["eac3", "e-ac-3", "ec3"]),
    ("opus", &["opus"]),
    ("mp3", &["mp3", "mp3float"]),
    ("vorbis", &["vorbis"]),
    ("alac", &["alac"]),
];

const SUBTITLE_ALIASES: &[(&str, &[&str])] = &[
    ("subrip", &["subrip", "srt"]),
    ("ass", &["ass", "ssa"]),
    ("pgs", &["hdmv_pgs_subtitle", "pgssub", "pgs"]),
    ("dvdsub", &["dvd_subtitle", "dvdsub", "vobsub"]),
    ("mov_text", &["mov_text", "tx3g"]),
    ("webvtt", &["webvtt"]),
];

fn canonical(tables: &[&[(&str, &[&str])]], codec: &str) -> String {
    let lowered = codec.trim().to_ascii_lowercase();
    tables
        .iter()
        .flat_map(|table| table.iter())
        .find(|(_, aliases)| aliases.contains(&lowered.as_str()))
        .map(|(name, _)| (*name).to_string())
        .unwrap_or(lowered)
}

/// Canonical lowercase codec name; unknown names are lowercased unchanged.
pub fn canonical_codec(codec: &str) -> String {
    canonical(&[VIDEO_ALIASES, AUDIO_ALIASES, SUBTITLE_ALIASES], codec)
}

/// Alias-aware codec comparison.
pub fn codecs_match(a: &str, b: &str) -> bool {
    canonical_codec(a) == canonical_codec(b)
}

/// True if `codec` matches any entry of `list`.
pub fn codec_in<S: AsRef<str>>(codec: &str, list: &[S]) -> bool {
    let codec = canonical_codec(codec);
    list.iter().any(|c| canonical_codec(c.as_ref()) == codec)
}

pub fn is_bitmap_subtitle(codec: &str) -> bool {
    matches!(canonical_codec(codec).as_str(), "pgs" | "dvdsub")
}
