//! Voice selection policy
//!
//! Voices are chosen by an ordered list of preference rules per language;
//! the first rule matched by any installed voice wins.

use duet_core::{Language, VoiceInfo};

type VoiceRule = fn(&VoiceInfo) -> bool;

fn name_has(voice: &VoiceInfo, needle: &str) -> bool {
    voice.name.to_lowercase().contains(needle)
}

static JAPANESE_RULES: [VoiceRule; 5] = [
    |v| name_has(v, "kyoko"),
    |v| name_has(v, "haruka"),
    |v| v.lang == "ja-JP" && name_has(v, "female"),
    |v| v.lang == "ja-JP",
    |v| v.lang.starts_with("ja"),
];

// Warm, expressive voices are preferred over generic ones.
static ENGLISH_RULES: [VoiceRule; 11] = [
    |v| v.name == "Samantha",
    |v| v.name == "Karen",
    |v| v.name == "Moira",
    |v| v.name == "Google UK English Female",
    |v| v.name == "Google US English",
    |v| name_has(v, "zira"),
    |v| name_has(v, "aria"),
    |v| v.lang == "en-US" && name_has(v, "female"),
    |v| v.lang == "en-GB" && !name_has(v, "male"),
    |v| v.lang == "en-US" && !name_has(v, "male"),
    |v| v.lang.starts_with("en"),
];

fn rules(language: Language) -> &'static [VoiceRule] {
    match language {
        Language::Japanese => &JAPANESE_RULES,
        Language::English => &ENGLISH_RULES,
    }
}

/// Pick the preferred installed voice for `language`.
///
/// `None` means the platform default voice should be used.
pub fn select_voice(language: Language, voices: &[VoiceInfo]) -> Option<VoiceInfo> {
    rules(language)
        .iter()
        .find_map(|rule| voices.iter().find(|v| rule(v)))
        .cloned()
}
