//! Sequential, cancellable speech playback
//!
//! The player owns at most one live speech queue. Every `speak` advances the
//! playback epoch before anything else, so a unit completion arriving from a
//! superseded queue finds its token stale and does nothing. `stop` and
//! persona switches cancel the same way, then silence the channel.
//!
//! While a queue is audible a keepalive task cycles pause/resume on the
//! channel, because platform engines can silently suspend long output.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use duet_config::SpeechConfig;
use duet_core::{Epoch, EpochToken, Error, Persona, PersonaMap, SpeechChannel, Utterance, VoiceProfile};

use super::prosody::EmotionParams;
use super::voice_select::select_voice;
use crate::processors::{clean_markup, segment};

/// Playback configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Speak at all; when false `speak` is a no-op
    pub enabled: bool,
    /// Pause/resume cycle period while speaking
    pub keepalive_interval: Duration,
    /// Base prosody per persona
    pub profiles: PersonaMap<VoiceProfile>,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self::from_settings(&SpeechConfig::default())
    }
}

impl PlaybackConfig {
    pub fn from_settings(settings: &SpeechConfig) -> Self {
        Self {
            enabled: settings.enabled,
            keepalive_interval: settings.keepalive_interval(),
            profiles: settings.profiles(),
        }
    }
}

/// Playback signals for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpeechEvent {
    /// First unit of a queue began playing
    Started { persona: Persona, units: usize },
    /// Queue exhausted or cancelled
    Stopped,
}

#[derive(Default)]
struct PlaybackState {
    /// Persona of the audible queue
    speaking: Option<Persona>,
    keepalive: Option<JoinHandle<()>>,
}

struct PlayerInner {
    channel: Arc<dyn SpeechChannel>,
    config: PlaybackConfig,
    enabled: AtomicBool,
    epoch: Epoch,
    state: Mutex<PlaybackState>,
    event_tx: broadcast::Sender<SpeechEvent>,
}

/// Speech playback engine
///
/// Cheap to clone; all clones drive the same queue. Must be used from
/// within a tokio runtime.
#[derive(Clone)]
pub struct SpeechPlayer {
    inner: Arc<PlayerInner>,
}

impl SpeechPlayer {
    pub fn new(channel: Arc<dyn SpeechChannel>, config: PlaybackConfig) -> Self {
        let (event_tx, _) = broadcast::channel(64);
        let enabled = AtomicBool::new(config.enabled);

        Self {
            inner: Arc::new(PlayerInner {
                channel,
                config,
                enabled,
                epoch: Epoch::new(),
                state: Mutex::new(PlaybackState::default()),
                event_tx,
            }),
        }
    }

    /// Subscribe to playback signals
    pub fn subscribe(&self) -> broadcast::Receiver<SpeechEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Speak `text` in `persona`'s voice, preempting anything already playing
    pub fn speak(&self, text: &str, persona: Persona) {
        if !self.is_enabled() {
            tracing::debug!(persona = %persona, "Speech disabled, skipping playback");
            return;
        }

        let token = self.inner.preempt();

        let cleaned = clean_markup(text);
        if cleaned.is_empty() {
            tracing::debug!(persona = %persona, "Nothing speakable after cleanup");
            return;
        }

        let units = segment(&cleaned);
        tracing::info!(
            persona = %persona,
            generation = token.generation(),
            units = units.len(),
            "Starting speech queue"
        );

        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            inner.run_queue(token, units, persona).await;
        });
    }

    /// Cancel playback immediately. Always emits `Stopped`.
    pub fn stop(&self) {
        {
            let mut state = self.inner.state.lock();
            self.inner.epoch.invalidate();
            if let Some(handle) = state.keepalive.take() {
                handle.abort();
            }
            state.speaking = None;
        }
        self.inner.channel.cancel_all();
        tracing::debug!(generation = self.inner.epoch.generation(), "Speech stopped");
        let _ = self.inner.event_tx.send(SpeechEvent::Stopped);
    }

    /// Enable or disable speech; disabling stops playback
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.inner.enabled.swap(enabled, Ordering::SeqCst);
        if was && !enabled {
            self.stop();
        }
    }

    /// Flip the enabled flag, returning the new value
    pub fn toggle_enabled(&self) -> bool {
        let enabled = !self.is_enabled();
        self.set_enabled(enabled);
        enabled
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.enabled.load(Ordering::SeqCst)
    }

    /// Whether a queue is currently audible
    pub fn is_speaking(&self) -> bool {
        self.inner.state.lock().speaking.is_some()
    }

    /// Persona whose queue is currently audible
    pub fn speaking_persona(&self) -> Option<Persona> {
        self.inner.state.lock().speaking
    }
}

impl PlayerInner {
    /// Invalidate the live queue and return the token for a new one
    fn preempt(&self) -> EpochToken {
        let (token, was_speaking) = {
            let mut state = self.state.lock();
            let token = self.epoch.advance();
            if let Some(handle) = state.keepalive.take() {
                handle.abort();
            }
            (token, state.speaking.take().is_some())
        };

        self.channel.cancel_all();
        if was_speaking {
            let _ = self.event_tx.send(SpeechEvent::Stopped);
        }
        token
    }

    async fn run_queue(self: Arc<Self>, token: EpochToken, units: Vec<String>, persona: Persona) {
        let profile = self.config.profiles[persona];
        let language = persona.language();
        let total = units.len();

        for (index, unit) in units.into_iter().enumerate() {
            if !token.is_current() {
                return;
            }

            // Recomputed per unit so prosody varies sentence to sentence
            let params = EmotionParams::for_unit(&unit, profile.base_pitch, profile.base_rate);
            let voice = select_voice(language, &self.channel.voices());
            let utterance = Utterance::new(unit, language)
                .with_voice(voice)
                .with_prosody(params.pitch, params.rate);

            if index == 0 {
                self.mark_started(&token, persona, total);
            }

            match self.channel.speak(utterance).await {
                Ok(()) => {}
                Err(Error::Interrupted) => break,
                Err(e) => {
                    tracing::warn!(
                        persona = %persona,
                        unit = index,
                        error = %e,
                        "Skipping unit that failed to synthesize"
                    );
                }
            }
        }

        self.finish(&token);
    }

    fn mark_started(self: &Arc<Self>, token: &EpochToken, persona: Persona, units: usize) {
        {
            let mut state = self.state.lock();
            if !token.is_current() {
                return;
            }
            state.speaking = Some(persona);
            state.keepalive = Some(self.spawn_keepalive(token.clone()));
        }
        let _ = self.event_tx.send(SpeechEvent::Started { persona, units });
    }

    fn finish(&self, token: &EpochToken) {
        {
            let mut state = self.state.lock();
            if !token.is_current() {
                return;
            }
            if let Some(handle) = state.keepalive.take() {
                handle.abort();
            }
            state.speaking = None;
        }
        tracing::debug!(generation = token.generation(), "Speech queue finished");
        let _ = self.event_tx.send(SpeechEvent::Stopped);
    }

    fn spawn_keepalive(&self, token: EpochToken) -> JoinHandle<()> {
        let channel = Arc::clone(&self.channel);
        let period = self.config.keepalive_interval;

        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                if !token.is_current() {
                    break;
                }
                if channel.is_speaking() {
                    channel.pause();
                    channel.resume();
                    tracing::trace!(generation = token.generation(), "Keepalive cycle");
                } else {
                    break;
                }
            }
        })
    }
}
