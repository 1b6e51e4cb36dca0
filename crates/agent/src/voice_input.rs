//! Voice command recognizer
//!
//! State machine turning a capture session into either a chat message or a
//! persona switch:
//!
//! ```text
//! Idle ──start──▶ Listening ──end (non-empty)──▶ Processing ──settle──▶ closed
//!   ▲                 │
//!   └──end (empty) / error / abort
//! ```
//!
//! Every capture and settle task carries an [`EpochToken`]. Closing the
//! session invalidates the epoch, so a late capture event or a settle timer
//! that fires after close is ignored. Closing is also the only path that
//! releases the capture device.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use duet_config::VoiceInputConfig;
use duet_core::{CaptureDevice, CaptureEvent, Epoch, EpochToken, Error, Language, Persona};

/// Phrases that switch to Miku; checked first
pub const MIKU_TRIGGERS: &[&str] = &[
    "miku mode",
    "switch to miku",
    "activate miku",
    "japanese mode",
    "ミクモード",
    "miku",
];

/// Phrases that switch to Eva
pub const EVA_TRIGGERS: &[&str] = &[
    "eva mode",
    "switch to eva",
    "activate eva",
    "english mode",
    "standard mode",
    "normal mode",
    "eva",
];

/// Detect a persona switch command in a transcript.
///
/// Case-insensitive substring match. The bare persona names are triggers
/// too, so any transcript mentioning "miku" or "eva" counts as a command.
pub fn detect_persona_switch(transcript: &str) -> Option<Persona> {
    let text = transcript.trim().to_lowercase();
    if text.is_empty() {
        return None;
    }

    if MIKU_TRIGGERS.iter().any(|t| text.contains(t)) {
        Some(Persona::Miku)
    } else if EVA_TRIGGERS.iter().any(|t| text.contains(t)) {
        Some(Persona::Eva)
    } else {
        None
    }
}

/// Recognizer phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoicePhase {
    #[default]
    Idle,
    Listening,
    Processing,
}

impl VoicePhase {
    /// Status line shown under the transcript
    pub fn status_text(&self) -> &'static str {
        match self {
            VoicePhase::Idle => "Tap to speak",
            VoicePhase::Listening => "Listening...",
            VoicePhase::Processing => "Processing...",
        }
    }
}

/// One open voice input session
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VoiceSession {
    pub phase: VoicePhase,
    pub transcript: String,
    pub error: Option<String>,
}

/// Recognizer events, for the presentation layer
#[derive(Debug, Clone, PartialEq)]
pub enum VoiceEvent {
    Opened(Language),
    PhaseChanged { old: VoicePhase, new: VoicePhase },
    Transcript(String),
    Error(String),
    SwitchCommand(Persona),
    MessageSent(String),
    Closed,
}

/// Receives the outcome of a voice turn
pub trait VoiceCommandSink: Send + Sync + 'static {
    /// A trigger phrase was recognised
    fn switch_persona(&self, persona: Persona);

    /// A transcript should be sent as a chat message
    fn submit_transcript(&self, text: &str);
}

/// What a finished turn resolves to
enum Outcome {
    Switch(Persona),
    Message(String),
}

impl Outcome {
    fn from_transcript(transcript: &str) -> Option<Self> {
        let text = transcript.trim();
        if text.is_empty() {
            return None;
        }
        Some(match detect_persona_switch(text) {
            Some(persona) => Outcome::Switch(persona),
            None => Outcome::Message(text.to_string()),
        })
    }
}

#[derive(Default)]
struct RecognizerState {
    session: Option<VoiceSession>,
    language: Language,
    listener: Option<JoinHandle<()>>,
    settle: Option<JoinHandle<()>>,
}

impl RecognizerState {
    /// Move to `new`, returning the transition if the phase changed
    fn set_phase(&mut self, new: VoicePhase) -> Option<VoiceEvent> {
        let session = self.session.as_mut()?;
        let old = std::mem::replace(&mut session.phase, new);
        (old != new).then_some(VoiceEvent::PhaseChanged { old, new })
    }

    fn abort_tasks(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
        if let Some(settle) = self.settle.take() {
            settle.abort();
        }
    }
}

struct RecognizerInner {
    device: Arc<dyn CaptureDevice>,
    sink: Arc<dyn VoiceCommandSink>,
    config: VoiceInputConfig,
    epoch: Epoch,
    state: Mutex<RecognizerState>,
    event_tx: broadcast::Sender<VoiceEvent>,
}

/// Voice input state machine
///
/// Holds at most one [`VoiceSession`]. Dropping the recognizer releases the
/// capture device.
pub struct VoiceCommandRecognizer {
    inner: Arc<RecognizerInner>,
}

impl VoiceCommandRecognizer {
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        sink: Arc<dyn VoiceCommandSink>,
        config: VoiceInputConfig,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(64);

        Self {
            inner: Arc::new(RecognizerInner {
                device,
                sink,
                config,
                epoch: Epoch::new(),
                state: Mutex::new(RecognizerState::default()),
                event_tx,
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<VoiceEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn is_open(&self) -> bool {
        self.inner.state.lock().session.is_some()
    }

    /// Snapshot of the open session
    pub fn session(&self) -> Option<VoiceSession> {
        self.inner.state.lock().session.clone()
    }

    pub fn phase(&self) -> Option<VoicePhase> {
        self.inner.state.lock().session.as_ref().map(|s| s.phase)
    }

    /// Open a session in `language` and start listening.
    ///
    /// Fails if a session is already open. A capture device that cannot be
    /// acquired is not an error here: the session stays idle and carries
    /// the error text.
    pub fn open(&self, language: Language) -> Result<(), Error> {
        {
            let mut state = self.inner.state.lock();
            if state.session.is_some() {
                return Err(Error::VoiceSessionActive);
            }
            state.session = Some(VoiceSession::default());
            state.language = language;
        }

        tracing::info!(lang = language.tag(), "Voice input opened");
        self.inner.emit(VoiceEvent::Opened(language));
        self.start_listening();
        Ok(())
    }

    /// Start a capture turn; only valid while the session is idle
    pub fn start_listening(&self) {
        let (token, language) = {
            let mut state = self.inner.state.lock();
            match state.session.as_mut() {
                Some(session) if session.phase == VoicePhase::Idle => {
                    session.transcript.clear();
                    session.error = None;
                }
                _ => return,
            }
            (self.inner.epoch.advance(), state.language)
        };

        let (tx, rx) = mpsc::unbounded_channel();
        if let Err(e) = self.inner.device.start(language, tx) {
            let message = match e {
                Error::CapabilityUnavailable(_) => "Speech recognition unavailable.".to_string(),
                other => other.to_string(),
            };
            tracing::warn!(error = %message, "Capture device unavailable");

            if let Some(session) = self.inner.state.lock().session.as_mut() {
                session.error = Some(message.clone());
            }
            self.inner.emit(VoiceEvent::Error(message));
            return;
        }

        let event = {
            let mut state = self.inner.state.lock();
            if !token.is_current() {
                drop(state);
                self.inner.device.abort();
                return;
            }
            let event = state.set_phase(VoicePhase::Listening);
            state.listener = Some(tokio::spawn(Arc::clone(&self.inner).listen(token, rx)));
            event
        };
        if let Some(event) = event {
            self.inner.emit(event);
        }
    }

    /// End capture gracefully; the final transcript is then processed
    pub fn stop_listening(&self) {
        if self.phase() == Some(VoicePhase::Listening) {
            self.inner.device.stop();
        }
    }

    /// Dispatch the current transcript immediately and close.
    ///
    /// Returns false when there is nothing to send.
    pub fn send_now(&self) -> bool {
        let outcome = {
            let state = self.inner.state.lock();
            match state.session.as_ref() {
                Some(session) if session.phase != VoicePhase::Idle => {
                    Outcome::from_transcript(&session.transcript)
                }
                _ => None,
            }
        };

        match outcome {
            Some(outcome) => {
                self.inner.finish(outcome);
                true
            }
            None => false,
        }
    }

    /// Close the session, aborting any capture in progress
    pub fn close(&self) {
        self.inner.close();
    }
}

impl Drop for VoiceCommandRecognizer {
    fn drop(&mut self) {
        self.inner.close();
    }
}

impl RecognizerInner {
    fn emit(&self, event: VoiceEvent) {
        let _ = self.event_tx.send(event);
    }

    async fn listen(self: Arc<Self>, token: EpochToken, mut rx: mpsc::UnboundedReceiver<CaptureEvent>) {
        while let Some(event) = rx.recv().await {
            if !token.is_current() {
                return;
            }
            match event {
                CaptureEvent::Interim(transcript) => {
                    if let Some(session) = self.state.lock().session.as_mut() {
                        session.transcript = transcript.clone();
                    }
                    self.emit(VoiceEvent::Transcript(transcript));
                }
                CaptureEvent::End => break,
                CaptureEvent::Error(code) => {
                    self.capture_failed(&token, &code);
                    return;
                }
            }
        }

        // Sender dropped without an explicit end counts as end of capture
        self.capture_ended(&token);
    }

    fn capture_failed(&self, token: &EpochToken, code: &str) {
        let (phase_event, message) = {
            let mut state = self.state.lock();
            if !token.is_current() {
                return;
            }
            state.listener = None;
            let message = (code != "aborted").then(|| format!("Error: {}. Tap to retry.", code));
            if let Some(session) = state.session.as_mut() {
                session.error = message.clone();
            }
            (state.set_phase(VoicePhase::Idle), message)
        };

        if let Some(message) = message {
            tracing::warn!(code = %code, "Capture failed");
            self.emit(VoiceEvent::Error(message));
        }
        if let Some(event) = phase_event {
            self.emit(event);
        }
    }

    fn capture_ended(self: Arc<Self>, token: &EpochToken) {
        let event = {
            let mut state = self.state.lock();
            if !token.is_current() {
                return;
            }
            state.listener = None;
            let transcript = match state.session.as_ref() {
                Some(session) => session.transcript.clone(),
                None => return,
            };

            match Outcome::from_transcript(&transcript) {
                Some(outcome) => {
                    let delay = match &outcome {
                        Outcome::Switch(_) => self.config.command_settle(),
                        Outcome::Message(_) => self.config.message_settle(),
                    };
                    state.settle = Some(tokio::spawn(
                        Arc::clone(&self).settle(token.clone(), delay, outcome),
                    ));
                    state.set_phase(VoicePhase::Processing)
                }
                None => state.set_phase(VoicePhase::Idle),
            }
        };

        if let Some(event) = event {
            self.emit(event);
        }
    }

    async fn settle(self: Arc<Self>, token: EpochToken, delay: Duration, outcome: Outcome) {
        tokio::time::sleep(delay).await;
        if token.is_current() {
            self.finish(outcome);
        }
    }

    /// Deliver the turn's outcome and close the session
    fn finish(&self, outcome: Outcome) {
        if !self.teardown() {
            return;
        }

        match outcome {
            Outcome::Switch(persona) => {
                tracing::info!(persona = %persona, "Voice switch command");
                self.sink.switch_persona(persona);
                self.emit(VoiceEvent::SwitchCommand(persona));
            }
            Outcome::Message(text) => {
                tracing::info!(chars = text.chars().count(), "Voice message");
                self.sink.submit_transcript(&text);
                self.emit(VoiceEvent::MessageSent(text));
            }
        }

        self.device.abort();
        self.emit(VoiceEvent::Closed);
    }

    fn close(&self) {
        let closed = self.teardown();
        self.device.abort();
        if closed {
            tracing::debug!("Voice input closed");
            self.emit(VoiceEvent::Closed);
        }
    }

    /// Drop the session and cancel its tasks; returns whether one was open.
    ///
    /// May run on the settle task itself. Its abort only lands at the next
    /// await, and it has none left.
    fn teardown(&self) -> bool {
        let mut state = self.state.lock();
        self.epoch.invalidate();
        state.abort_tasks();
        state.session.take().is_some()
    }
}
