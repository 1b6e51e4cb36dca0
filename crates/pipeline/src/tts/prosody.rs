//! Emotional prosody model
//!
//! Each unit gets pitch and rate derived from its persona's base values,
//! nudged by sentence shape (question, exclamation, trailing ellipsis,
//! length) and by a few affect lexicons. The adjustments are cumulative and
//! independent of each other. A small random jitter is added last so that
//! two identical sentences never sound exactly the same.

use once_cell::sync::Lazy;
use rand::Rng;
use regex::Regex;

use duet_config::constants::speech::{PROSODY_MAX, PROSODY_MIN};

use crate::processors::word_count;

/// Jitter amplitude: pitch varies by at most ±0.01, rate by ±0.0075
const PITCH_JITTER: f32 = 0.02;
const RATE_JITTER: f32 = 0.015;

const SHORT_WORDS: usize = 4;
const LONG_WORDS: usize = 18;

static JOY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(wonderful|amazing|love|beautiful|exciting|great|fantastic|perfect)\b").unwrap()
});
static SADNESS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(sorry|unfortunate|sad|miss|lost|difficult|hard|struggle)\b").unwrap()
});
static CURIOSITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(interesting|curious|wonder|perhaps|maybe|imagine|actually)\b").unwrap()
});

/// Pitch and rate for one unit, both within `[0.5, 2.0]`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionParams {
    pub pitch: f32,
    pub rate: f32,
}

impl EmotionParams {
    /// Compute parameters with thread-local randomness
    pub fn for_unit(unit: &str, base_pitch: f32, base_rate: f32) -> Self {
        Self::for_unit_with_rng(unit, base_pitch, base_rate, &mut rand::thread_rng())
    }

    /// Compute parameters with a caller-supplied random source
    pub fn for_unit_with_rng<R: Rng + ?Sized>(
        unit: &str,
        base_pitch: f32,
        base_rate: f32,
        rng: &mut R,
    ) -> Self {
        let (pitch_delta, rate_delta) = feature_deltas(unit);

        let pitch = base_pitch + pitch_delta + (rng.gen::<f32>() - 0.5) * PITCH_JITTER;
        let rate = base_rate + rate_delta + (rng.gen::<f32>() - 0.5) * RATE_JITTER;

        Self {
            pitch: pitch.clamp(PROSODY_MIN, PROSODY_MAX),
            rate: rate.clamp(PROSODY_MIN, PROSODY_MAX),
        }
    }
}

/// Deterministic part of the model: summed `(pitch, rate)` adjustments
pub fn feature_deltas(unit: &str) -> (f32, f32) {
    let s = unit.trim();
    let words = word_count(s);
    let lower = s.to_lowercase();

    let mut pitch = 0.0_f32;
    let mut rate = 0.0_f32;

    if s.ends_with('?') {
        pitch += 0.08;
        rate -= 0.03;
    }
    if s.ends_with('!') {
        pitch += 0.08;
        rate += 0.04;
    }
    if s.ends_with('…') || s.ends_with("...") {
        pitch -= 0.05;
        rate -= 0.06;
    }
    if words <= SHORT_WORDS {
        rate += 0.03;
    }
    if words >= LONG_WORDS {
        rate -= 0.04;
    }
    if JOY.is_match(&lower) {
        pitch += 0.04;
        rate += 0.02;
    }
    if SADNESS.is_match(&lower) {
        pitch -= 0.04;
        rate -= 0.04;
    }
    if CURIOSITY.is_match(&lower) {
        pitch += 0.02;
        rate -= 0.01;
    }

    (pitch, rate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const EPS: f32 = 1e-4;

    fn close(a: f32, b: f32, tolerance: f32) -> bool {
        (a - b).abs() <= tolerance
    }

    #[test]
    fn test_question_and_short() {
        let (pitch, rate) = feature_deltas("Are you there?");
        assert!(close(pitch, 0.08, EPS));
        assert!(close(rate, -0.03 + 0.03, EPS));
    }

    #[test]
    fn test_exclamation_with_joy() {
        let (pitch, rate) = feature_deltas("That is such a wonderful idea, truly!");
        assert!(close(pitch, 0.08 + 0.04, EPS));
        assert!(close(rate, 0.04 + 0.02, EPS));
    }

    #[test]
    fn test_ellipsis_variants() {
        let (a, _) = feature_deltas("Well, I suppose so...");
        let (b, _) = feature_deltas("Well, I suppose so…");
        assert!(close(a, -0.05, EPS));
        assert!(close(b, -0.05, EPS));
    }

    #[test]
    fn test_lexicon_is_whole_word_and_case_insensitive() {
        let (pitch, _) = feature_deltas("I MISS the old days of the city we grew up in");
        assert!(close(pitch, -0.04, EPS));

        // "missing" is not "miss", "greatly" is not "great"
        let (pitch, rate) = feature_deltas("We are missing the point here greatly today");
        assert!(close(pitch, 0.0, EPS));
        assert!(close(rate, 0.0, EPS));
    }

    #[test]
    fn test_long_sentence() {
        let unit = "one two three four five six seven eight nine ten eleven twelve thirteen fourteen fifteen sixteen seventeen eighteen";
        let (_, rate) = feature_deltas(unit);
        assert!(close(rate, -0.04, EPS));
    }

    #[test]
    fn test_jitter_bounds() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let params = EmotionParams::for_unit_with_rng("This is a plain statement of fact.", 1.0, 1.0, &mut rng);
            assert!(close(params.pitch, 1.0, 0.01 + EPS));
            assert!(close(params.rate, 1.0, 0.0075 + EPS));
        }
    }

    #[test]
    fn test_repeated_sentences_vary() {
        let mut rng = StdRng::seed_from_u64(42);
        let a = EmotionParams::for_unit_with_rng("Hello there.", 1.1, 0.94, &mut rng);
        let b = EmotionParams::for_unit_with_rng("Hello there.", 1.1, 0.94, &mut rng);
        assert_ne!(a, b);
    }

    #[test]
    fn test_clamped_for_extreme_input() {
        let long_sad = format!("{} sorry hard lost!", "word ".repeat(50));
        for (pitch, rate) in [(0.5, 0.5), (2.0, 2.0), (0.1, 3.0)] {
            let params = EmotionParams::for_unit(&long_sad, pitch, rate);
            assert!((0.5..=2.0).contains(&params.pitch));
            assert!((0.5..=2.0).contains(&params.rate));
        }
    }
}
