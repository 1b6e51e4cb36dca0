//! Sentence segmentation for sequential synthesis
//!
//! A response is split into speakable units so that each sentence can be
//! played with its own prosody. Text without usable punctuation is chunked
//! by word count instead, which keeps individual utterances short enough for
//! platform engines that truncate long input.

use once_cell::sync::Lazy;
use regex::Regex;

/// Terminal punctuation followed by whitespace
static TERMINAL_GAP: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?…])\s+").unwrap());
/// Terminal punctuation at the very end of the text
static TERMINAL_END: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?…])$").unwrap());

/// Unpunctuated text longer than this is chunked by words
const CHUNK_THRESHOLD_WORDS: usize = 12;
const CHUNK_WORDS: usize = 10;

/// Number of whitespace-separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Split `text` into ordered speakable units.
///
/// Single-character pieces are stray punctuation and are discarded, except
/// that a lone letter or digit ("I", "2") is attached to its neighbour so no
/// content is lost. If this yields at most one unit and the text has more
/// than twelve words, the text is chunked into ten-word units. If nothing is
/// left, the whole text is returned as a single unit.
pub fn segment(text: &str) -> Vec<String> {
    let marked = TERMINAL_GAP.replace_all(text, "${1}\n");
    let marked = TERMINAL_END.replace(&marked, "${1}\n");

    let mut units: Vec<String> = Vec::new();
    let mut carry: Option<&str> = None;

    for piece in marked.split('\n').map(str::trim).filter(|p| !p.is_empty()) {
        if piece.chars().count() > 1 {
            let unit = match carry.take() {
                Some(prefix) => format!("{} {}", prefix, piece),
                None => piece.to_string(),
            };
            units.push(unit);
            continue;
        }

        if !piece.chars().any(char::is_alphanumeric) {
            continue;
        }

        match units.last_mut() {
            Some(last) => {
                last.push(' ');
                last.push_str(piece);
            }
            None => carry = Some(piece),
        }
    }

    if units.len() <= 1 && word_count(text) > CHUNK_THRESHOLD_WORDS {
        let words: Vec<&str> = text.split_whitespace().collect();
        return words
            .chunks(CHUNK_WORDS)
            .map(|chunk| chunk.join(" "))
            .collect();
    }

    if units.is_empty() {
        return vec![text.to_string()];
    }

    units
}
