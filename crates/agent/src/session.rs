//! Session controller
//!
//! Owns both persona conversations and the active persona selector, issues
//! requests to the answer service and drives speech playback.
//!
//! The persona a request belongs to is fixed when it is sent. A switch during
//! the round-trip cannot misroute the answer: it is always recorded in the
//! sending persona's history, and only spoken if that persona is still
//! active when the answer arrives. The per-persona `pending` flag is the only
//! concurrency guard, so both personas may have a request in flight at once.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use uuid::Uuid;

use duet_config::constants::service::USER_ID_PREFIX;
use duet_config::ServiceConfig;
use duet_core::{
    AnswerRequest, AnswerService, ConversationState, Message, Persona, PersonaMap, Role,
};
use duet_pipeline::SpeechPlayer;

use crate::notification::PersonaNotifier;
use crate::shortcut::KeyChord;
use crate::voice_input::VoiceCommandSink;
use crate::AgentError;

/// Generate a per-process user id (`user-` + 8 hex chars)
pub fn generate_user_id() -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{}{}", USER_ID_PREFIX, &id[..8])
}

/// Session configuration
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Stable identifier sent with every request
    pub user_id: String,
    /// Persona active at startup
    pub initial_persona: Persona,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            user_id: generate_user_id(),
            initial_persona: Persona::Miku,
        }
    }
}

impl SessionConfig {
    pub fn from_settings(settings: &ServiceConfig) -> Self {
        Self {
            user_id: settings.user_id.clone().unwrap_or_else(generate_user_id),
            ..Self::default()
        }
    }
}

/// Why a send was not accepted
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendRejected {
    #[error("message is empty")]
    Empty,

    #[error("a request is already pending for {0}")]
    Pending(Persona),
}

/// Session events, for the presentation layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A message was appended to a persona's history
    MessageAppended { persona: Persona, role: Role },
    /// A persona's in-flight flag changed
    PendingChanged { persona: Persona, pending: bool },
    /// Active persona changed
    PersonaSwitched { from: Persona, to: Persona },
    /// An answer arrived for a persona that is no longer active
    SpeechSuppressed { persona: Persona },
    /// History cleared for one persona, or both
    HistoryCleared { persona: Option<Persona> },
}

struct SessionState {
    active: Persona,
    conversations: PersonaMap<ConversationState>,
    input: String,
}

struct SessionInner {
    answers: Arc<dyn AnswerService>,
    player: SpeechPlayer,
    notifier: PersonaNotifier,
    user_id: String,
    state: Mutex<SessionState>,
    event_tx: broadcast::Sender<SessionEvent>,
}

/// Top-level orchestrator for the two personas
///
/// Cheap to clone; all clones share one session.
#[derive(Clone)]
pub struct SessionController {
    inner: Arc<SessionInner>,
}

/// Clears `pending` for its persona when dropped, including when the request
/// task is cancelled
struct PendingGuard {
    inner: Arc<SessionInner>,
    persona: Persona,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.inner.state.lock().conversations[self.persona].set_pending(false);
        let _ = self.inner.event_tx.send(SessionEvent::PendingChanged {
            persona: self.persona,
            pending: false,
        });
    }
}

fn failure_message(error: &duet_core::Error) -> String {
    format!(
        "[ CONNECTION LOST ]\n\nBackend unreachable.\n\nStart the answer service and try again:\n\n  cd backend\n  uvicorn main:app --reload\n\n{}",
        error
    )
}

impl SessionController {
    pub fn new(
        config: SessionConfig,
        answers: Arc<dyn AnswerService>,
        player: SpeechPlayer,
        notifier: PersonaNotifier,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);

        Self {
            inner: Arc::new(SessionInner {
                answers,
                player,
                notifier,
                user_id: config.user_id,
                state: Mutex::new(SessionState {
                    active: config.initial_persona,
                    conversations: PersonaMap::default(),
                    input: String::new(),
                }),
                event_tx,
            }),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.event_tx.subscribe()
    }

    pub fn user_id(&self) -> &str {
        &self.inner.user_id
    }

    pub fn player(&self) -> &SpeechPlayer {
        &self.inner.player
    }

    pub fn notifier(&self) -> &PersonaNotifier {
        &self.inner.notifier
    }

    /// Send `text` to `persona`, or to the active persona when `None`.
    ///
    /// The user message is recorded and `pending` set before this returns.
    /// The returned handle resolves once the answer (or failure notice) has
    /// been recorded.
    pub fn send(&self, text: &str, persona: Option<Persona>) -> Result<JoinHandle<()>, SendRejected> {
        let message = text.trim();
        if message.is_empty() {
            return Err(SendRejected::Empty);
        }

        let persona = {
            let mut state = self.inner.state.lock();
            let persona = persona.unwrap_or(state.active);
            let conversation = &mut state.conversations[persona];
            if conversation.pending() {
                tracing::debug!(persona = %persona, "Send rejected, request already pending");
                return Err(SendRejected::Pending(persona));
            }
            conversation.push(Message::user(message));
            conversation.set_pending(true);
            state.input.clear();
            persona
        };

        self.inner.player.stop();
        self.emit(SessionEvent::MessageAppended {
            persona,
            role: Role::User,
        });
        self.emit(SessionEvent::PendingChanged {
            persona,
            pending: true,
        });

        let guard = PendingGuard {
            inner: Arc::clone(&self.inner),
            persona,
        };
        let request = AnswerRequest::new(self.inner.user_id.clone(), message, persona);
        tracing::info!(persona = %persona, chars = message.chars().count(), "Sending question");

        let inner = Arc::clone(&self.inner);
        Ok(tokio::spawn(async move {
            inner.complete(request, guard).await;
        }))
    }

    /// Replace the draft input
    pub fn set_input(&self, text: impl Into<String>) {
        self.inner.state.lock().input = text.into();
    }

    pub fn input(&self) -> String {
        self.inner.state.lock().input.clone()
    }

    /// Send the draft input to the active persona
    pub fn send_input(&self) -> Result<JoinHandle<()>, SendRejected> {
        let input = self.input();
        self.send(&input, None)
    }

    /// Make `persona` active, notify, and silence any ongoing speech
    pub fn switch_persona(&self, persona: Persona) {
        let from = {
            let mut state = self.inner.state.lock();
            std::mem::replace(&mut state.active, persona)
        };

        tracing::info!(from = %from, to = %persona, "Persona switched");
        self.inner.notifier.show(persona);
        self.inner.player.stop();
        self.emit(SessionEvent::PersonaSwitched { from, to: persona });
    }

    /// Switch to the other persona
    pub fn toggle_persona(&self) -> Persona {
        let next = self.active_persona().other();
        self.switch_persona(next);
        next
    }

    /// Apply a keyboard shortcut; returns whether it was handled
    pub fn handle_shortcut(&self, chord: KeyChord) -> bool {
        if chord.is_persona_toggle() {
            self.toggle_persona();
            true
        } else {
            false
        }
    }

    pub fn active_persona(&self) -> Persona {
        self.inner.state.lock().active
    }

    /// Snapshot of the active persona's conversation
    pub fn active_conversation(&self) -> ConversationState {
        let state = self.inner.state.lock();
        state.conversations[state.active].clone()
    }

    pub fn active_pending(&self) -> bool {
        let state = self.inner.state.lock();
        state.conversations[state.active].pending()
    }

    /// Snapshot of one persona's conversation
    pub fn conversation(&self, persona: Persona) -> ConversationState {
        self.inner.state.lock().conversations[persona].clone()
    }

    /// Speak an assistant message of the active conversation again
    pub fn replay(&self, index: usize) -> Result<(), AgentError> {
        let (content, persona) = {
            let state = self.inner.state.lock();
            let conversation = &state.conversations[state.active];
            match conversation.history().get(index) {
                Some(message) if message.is_assistant() => (message.content.clone(), state.active),
                _ => return Err(AgentError::NoSuchMessage(index)),
            }
        };

        self.inner.player.speak(&content, persona);
        Ok(())
    }

    /// Clear local and remote history for one persona, or both.
    ///
    /// Refused while an affected persona has a request pending.
    pub async fn clear_history(&self, persona: Option<Persona>) -> Result<(), AgentError> {
        let targets: Vec<Persona> = match persona {
            Some(p) => vec![p],
            None => Persona::ALL.to_vec(),
        };

        {
            let mut state = self.inner.state.lock();
            if let Some(busy) = targets.iter().find(|p| state.conversations[**p].pending()) {
                return Err(AgentError::Pending(*busy));
            }
            for p in &targets {
                state.conversations[*p].clear();
            }
        }

        self.emit(SessionEvent::HistoryCleared { persona });
        self.inner
            .answers
            .clear_history(&self.inner.user_id, persona)
            .await?;
        Ok(())
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.inner.event_tx.send(event);
    }
}

impl SessionInner {
    async fn complete(self: Arc<Self>, request: AnswerRequest, guard: PendingGuard) {
        let persona = request.mode;

        let (content, answered) = match self.answers.ask(&request).await {
            Ok(answer) => (answer.response, true),
            Err(e) => {
                tracing::warn!(persona = %persona, error = %e, "Answer request failed");
                (failure_message(&e), false)
            }
        };

        let still_active = {
            let mut state = self.state.lock();
            state.conversations[persona].push(Message::assistant(content.clone()));
            state.active == persona
        };

        let _ = self.event_tx.send(SessionEvent::MessageAppended {
            persona,
            role: Role::Assistant,
        });
        drop(guard);

        if !answered {
            return;
        }

        if still_active {
            self.player.speak(&content, persona);
        } else {
            tracing::debug!(persona = %persona, "Persona no longer active, not speaking answer");
            let _ = self.event_tx.send(SessionEvent::SpeechSuppressed { persona });
        }
    }
}

impl VoiceCommandSink for SessionController {
    fn switch_persona(&self, persona: Persona) {
        SessionController::switch_persona(self, persona);
    }

    fn submit_transcript(&self, text: &str) {
        if let Err(rejected) = self.send(text, None) {
            tracing::debug!(reason = %rejected, "Voice transcript not sent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use duet_core::{AnswerResponse, Error, Result, SpeechChannel, Utterance, VoiceInfo};
    use duet_pipeline::PlaybackConfig;
    use std::time::Duration;

    /// Answers "<mode>:<question>" after 100ms
    struct EchoService;

    #[async_trait]
    impl AnswerService for EchoService {
        async fn ask(&self, request: &AnswerRequest) -> Result<AnswerResponse> {
            tokio::time::sleep(Duration::from_millis(100)).await;
            if request.question == "fail" {
                return Err(Error::Api {
                    status: 502,
                    message: "bad gateway".to_string(),
                });
            }
            Ok(AnswerResponse::new(format!("{}:{}", request.mode, request.question)))
        }

        async fn health(&self) -> Result<bool> {
            Ok(true)
        }

        async fn clear_history(&self, _user_id: &str, _persona: Option<Persona>) -> Result<()> {
            Ok(())
        }
    }

    struct SilentChannel;

    #[async_trait]
    impl SpeechChannel for SilentChannel {
        async fn speak(&self, _utterance: Utterance) -> Result<()> {
            Ok(())
        }
        fn pause(&self) {}
        fn resume(&self) {}
        fn cancel_all(&self) {}
        fn is_speaking(&self) -> bool {
            false
        }
        fn voices(&self) -> Vec<VoiceInfo> {
            Vec::new()
        }
    }

    fn controller() -> SessionController {
        let player = SpeechPlayer::new(Arc::new(SilentChannel), PlaybackConfig::default());
        SessionController::new(
            SessionConfig::default(),
            Arc::new(EchoService),
            player,
            PersonaNotifier::new(Duration::from_millis(2200)),
        )
    }

    #[test]
    fn test_generated_user_id() {
        let id = generate_user_id();
        assert!(id.starts_with("user-"));
        assert_eq!(id.len(), 13);
        assert_ne!(id, generate_user_id());
    }

    #[test]
    fn test_config_prefers_fixed_user_id() {
        let settings = ServiceConfig {
            user_id: Some("user-fixed".to_string()),
            ..ServiceConfig::default()
        };
        assert_eq!(SessionConfig::from_settings(&settings).user_id, "user-fixed");
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_send_rejected() {
        let session = controller();
        assert_eq!(session.send("   ", None).unwrap_err(), SendRejected::Empty);
        assert!(session.active_conversation().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_records_both_messages() {
        let session = controller();
        session.set_input("  hello  ");

        let handle = session.send_input().unwrap();
        assert!(session.active_pending());
        assert_eq!(session.input(), "");

        handle.await.unwrap();
        let conversation = session.active_conversation();
        assert!(!conversation.pending());
        let contents: Vec<_> = conversation.history().iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["hello", "miku:hello"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_duplicate_send_rejected_other_persona_accepted() {
        let session = controller();

        let first = session.send("one", None).unwrap();
        assert_eq!(
            session.send("two", None).unwrap_err(),
            SendRejected::Pending(Persona::Miku)
        );
        let other = session.send("three", Some(Persona::Eva)).unwrap();

        first.await.unwrap();
        other.await.unwrap();
        assert_eq!(session.conversation(Persona::Miku).len(), 2);
        assert_eq!(session.conversation(Persona::Eva).len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failure_becomes_message() {
        let session = controller();
        session.send("fail", None).unwrap().await.unwrap();

        let conversation = session.active_conversation();
        let reply = conversation.last_assistant().unwrap();
        assert!(reply.content.starts_with("[ CONNECTION LOST ]"));
        assert!(reply.content.contains("HTTP 502"));
        assert!(!conversation.pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_aborted_request_clears_pending() {
        let session = controller();
        let handle = session.send("hello", None).unwrap();
        handle.abort();
        let _ = handle.await;

        assert!(!session.active_pending());
        assert!(session.send("again", None).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_switch_notifies_and_keeps_histories() {
        let session = controller();
        let mut events = session.subscribe();

        session.send("hi", None).unwrap().await.unwrap();
        assert!(session.handle_shortcut(KeyChord::ctrl('m')));

        assert_eq!(session.active_persona(), Persona::Eva);
        assert_eq!(session.notifier().visible(), Some(Persona::Eva));
        assert!(session.active_conversation().is_empty());
        assert_eq!(session.conversation(Persona::Miku).len(), 2);

        let mut switched = false;
        while let Ok(event) = events.try_recv() {
            if event == (SessionEvent::PersonaSwitched { from: Persona::Miku, to: Persona::Eva }) {
                switched = true;
            }
        }
        assert!(switched);
    }

    #[tokio::test(start_paused = true)]
    async fn test_replay_requires_assistant_message() {
        let session = controller();
        session.send("hi", None).unwrap().await.unwrap();

        assert_eq!(session.replay(0), Err(AgentError::NoSuchMessage(0)));
        assert!(session.replay(1).is_ok());
        assert_eq!(session.replay(7), Err(AgentError::NoSuchMessage(7)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_history_refused_while_pending() {
        let session = controller();
        session.send("keep", Some(Persona::Eva)).unwrap().await.unwrap();
        let pending = session.send("wait", None).unwrap();

        assert_eq!(
            session.clear_history(None).await,
            Err(AgentError::Pending(Persona::Miku))
        );
        assert_eq!(session.conversation(Persona::Eva).len(), 2);

        session.clear_history(Some(Persona::Eva)).await.unwrap();
        assert!(session.conversation(Persona::Eva).is_empty());

        pending.await.unwrap();
        session.clear_history(None).await.unwrap();
        assert!(session.conversation(Persona::Miku).is_empty());
    }
}
