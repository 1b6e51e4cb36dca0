//! Markup stripping for spoken output

use once_cell::sync::Lazy;
use regex::Regex;

static BRACKETED: Lazy<Regex> = Lazy::new(|| Regex::new(r"\[.*?\]").unwrap());
static EMPHASIS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\*+").unwrap());
static HEADING: Lazy<Regex> = Lazy::new(|| Regex::new(r"#{1,6}\s").unwrap());
static CODE: Lazy<Regex> = Lazy::new(|| Regex::new(r"`{1,3}").unwrap());

/// Remove bracketed asides, emphasis, heading and code markers.
///
/// The result is trimmed; an empty string means there is nothing to speak.
pub fn clean_markup(text: &str) -> String {
    let text = BRACKETED.replace_all(text, "");
    let text = EMPHASIS.replace_all(&text, "");
    let text = HEADING.replace_all(&text, "");
    let text = CODE.replace_all(&text, "");
    text.trim().to_string()
}
