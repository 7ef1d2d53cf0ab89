//! Language code comparison across ISO 639 variants.

/// (639-2/B, 639-2/T, 639-1) triples for languages whose codes differ.
const EQUIVALENTS: &[(&str, &str, &str)] = &[
    ("alb", "sqi", "sq"),
    ("ara", "ara", "ar"),
    ("arm", "hye", "hy"),
    ("baq", "eus", "eu"),
    ("bur", "mya", "my"),
    ("chi", "zho", "zh"),
    ("cze", "ces", "cs"),
    ("dan", "dan", "da"),
    ("dut", "nld", "nl"),
    ("eng", "eng", "en"),
    ("fin", "fin", "fi"),
    ("fre", "fra", "fr"),
    ("geo", "kat", "ka"),
    ("ger", "deu", "de"),
    ("gre", "ell", "el"),
    ("heb", "heb", "he"),
    ("hin", "hin", "hi"),
    ("hun", "hun", "hu"),
    ("ice", "isl", "is"),
    ("ita", "ita", "it"),
    ("jpn", "jpn", "ja"),
    ("kor", "kor", "ko"),
    ("mac", "mkd", "mk"),
    ("mao", "mri", "mi"),
    ("may", "msa", "ms"),
    ("nor", "nor", "no"),
    ("per", "fas", "fa"),
    ("pol", "pol", "pl"),
    ("por", "por", "pt"),
    ("rum", "ron", "ro"),
    ("rus", "rus", "ru"),
    ("slo", "slk", "sk"),
    ("spa", "spa", "es"),
    ("swe", "swe", "sv"),
    ("tha", "tha", "th"),
    ("tib", "bod", "bo"),
    ("tur", "tur", "tr"),
    ("ukr", "ukr", "uk"),
    ("vie", "vie", "vi"),
    ("wel", "cym", "cy"),
];

/// Canonical 639-2/B form of a language code, lowercased.
pub fn normalize_language(code: &str) -> String {
    let lower = code.trim().to_ascii_lowercase();
    EQUIVALENTS
        .iter()
        .find(|(b, t, one)| lower == *b || lower == *t || lower == *one)
        .map(|(b, _, _)| (*b).to_string())
        .unwrap_or(lower)
}

/// Case-insensitive comparison that treats B/T/1 variants as equal.
pub fn languages_match(a: &str, b: &str) -> bool {
    normalize_language(a) == normalize_language(b)
}

/// True when `code` matches any entry of `list`.
pub fn language_in(code: &str, list: &[String]) -> bool {
    list.iter().any(|l| languages_match(code, l))
}
