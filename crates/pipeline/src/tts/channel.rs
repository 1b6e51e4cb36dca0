//! Speech channel that logs utterances instead of producing audio
//!
//! Used by the terminal front-end and in tests. Each utterance "plays" for a
//! duration proportional to its length and rate, honouring pause, resume and
//! cancel-all like a platform engine would.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;

use duet_core::{Error, Result, SpeechChannel, Utterance, VoiceInfo};

/// Simulated time per character at rate 1.0
const DEFAULT_PER_CHAR: Duration = Duration::from_millis(55);

/// Reference [`SpeechChannel`] writing each utterance to the log
pub struct LoggingSpeechChannel {
    voices: Vec<VoiceInfo>,
    per_char: Duration,
    speaking: AtomicBool,
    paused: watch::Sender<bool>,
    cancel: watch::Sender<u64>,
    spoken: Mutex<Vec<Utterance>>,
    keepalive_cycles: AtomicUsize,
}

impl LoggingSpeechChannel {
    pub fn new(voices: Vec<VoiceInfo>) -> Self {
        let (paused, _) = watch::channel(false);
        let (cancel, _) = watch::channel(0);
        Self {
            voices,
            per_char: DEFAULT_PER_CHAR,
            speaking: AtomicBool::new(false),
            paused,
            cancel,
            spoken: Mutex::new(Vec::new()),
            keepalive_cycles: AtomicUsize::new(0),
        }
    }

    /// Channel offering one common voice per language
    pub fn with_default_voices() -> Self {
        Self::new(vec![
            VoiceInfo::new("Kyoko", "ja-JP"),
            VoiceInfo::new("Samantha", "en-US"),
            VoiceInfo::new("Daniel", "en-GB"),
        ])
    }

    /// Override simulated time per character
    pub fn with_char_duration(mut self, per_char: Duration) -> Self {
        self.per_char = per_char;
        self
    }

    /// Utterances started so far
    pub fn spoken(&self) -> Vec<Utterance> {
        self.spoken.lock().clone()
    }

    /// Number of pause calls received
    pub fn keepalive_cycles(&self) -> usize {
        self.keepalive_cycles.load(Ordering::SeqCst)
    }

    fn duration_of(&self, utterance: &Utterance) -> Duration {
        let chars = utterance.text.chars().count() as f32;
        self.per_char.mul_f32(chars / utterance.rate.max(0.1))
    }
}

impl Default for LoggingSpeechChannel {
    fn default() -> Self {
        Self::with_default_voices()
    }
}

#[async_trait]
impl SpeechChannel for LoggingSpeechChannel {
    async fn speak(&self, utterance: Utterance) -> Result<()> {
        if !utterance.text.chars().any(char::is_alphanumeric) {
            return Err(Error::Synthesis(format!("nothing to say in {:?}", utterance.text)));
        }

        let mut cancelled = self.cancel.subscribe();
        let mut paused = self.paused.subscribe();
        let mut remaining = self.duration_of(&utterance);

        tracing::info!(
            voice = utterance.voice.as_ref().map(|v| v.name.as_str()).unwrap_or("default"),
            lang = utterance.language.tag(),
            pitch = utterance.pitch,
            rate = utterance.rate,
            "🔊 {}",
            utterance.text
        );
        self.spoken.lock().push(utterance);
        self.speaking.store(true, Ordering::SeqCst);

        let result = loop {
            let is_paused = *paused.borrow_and_update();
            let started = Instant::now();

            if is_paused {
                tokio::select! {
                    _ = cancelled.changed() => break Err(Error::Interrupted),
                    _ = paused.changed() => continue,
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(remaining) => break Ok(()),
                _ = cancelled.changed() => break Err(Error::Interrupted),
                _ = paused.changed() => {
                    remaining = remaining.saturating_sub(started.elapsed());
                }
            }
        };

        self.speaking.store(false, Ordering::SeqCst);
        result
    }

    fn pause(&self) {
        self.keepalive_cycles.fetch_add(1, Ordering::SeqCst);
        self.paused.send_replace(true);
    }

    fn resume(&self) {
        self.paused.send_replace(false);
    }

    fn cancel_all(&self) {
        self.paused.send_replace(false);
        self.cancel.send_modify(|generation| *generation += 1);
    }

    fn is_speaking(&self) -> bool {
        self.speaking.load(Ordering::SeqCst)
    }

    fn voices(&self) -> Vec<VoiceInfo> {
        self.voices.clone()
    }
}
