//! End-to-end flows across the session controller, speech playback and the
//! voice command recognizer, with a scripted answer service.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

use duet_agent::{
    KeyChord, PersonaNotifier, SendRejected, SessionConfig, SessionController, SessionEvent,
    VoiceCommandRecognizer,
};
use duet_config::VoiceInputConfig;
use duet_core::{
    AnswerRequest, AnswerResponse, AnswerService, Error, Language, Persona, Result, Role,
};
use duet_pipeline::{LoggingSpeechChannel, ManualCapture, PlaybackConfig, SpeechEvent, SpeechPlayer};

/// Answers `"<mode> says: <question>"`. Questions starting with `slow` take
/// two seconds, everything else 100ms. `down` fails like a dead backend.
#[derive(Default)]
struct ScriptedService {
    requests: Mutex<Vec<AnswerRequest>>,
    clears: Mutex<Vec<Option<Persona>>>,
}

#[async_trait]
impl AnswerService for ScriptedService {
    async fn ask(&self, request: &AnswerRequest) -> Result<AnswerResponse> {
        self.requests.lock().push(request.clone());

        let delay = if request.question.starts_with("slow") {
            Duration::from_secs(2)
        } else {
            Duration::from_millis(100)
        };
        tokio::time::sleep(delay).await;

        if request.question == "down" {
            return Err(Error::Transport("connection refused".to_string()));
        }
        Ok(AnswerResponse::new(format!(
            "{} says: {}",
            request.mode, request.question
        )))
    }

    async fn health(&self) -> Result<bool> {
        Ok(true)
    }

    async fn clear_history(&self, _user_id: &str, persona: Option<Persona>) -> Result<()> {
        self.clears.lock().push(persona);
        Ok(())
    }
}

struct Harness {
    session: SessionController,
    service: Arc<ScriptedService>,
    channel: Arc<LoggingSpeechChannel>,
}

fn harness() -> Harness {
    let service = Arc::new(ScriptedService::default());
    let channel = Arc::new(LoggingSpeechChannel::with_default_voices());
    let player = SpeechPlayer::new(channel.clone(), PlaybackConfig::default());
    let session = SessionController::new(
        SessionConfig {
            user_id: "user-test0001".to_string(),
            initial_persona: Persona::Miku,
        },
        service.clone(),
        player,
        PersonaNotifier::new(Duration::from_millis(2200)),
    );

    Harness {
        session,
        service,
        channel,
    }
}

fn contents(session: &SessionController, persona: Persona) -> Vec<String> {
    session
        .conversation(persona)
        .history()
        .iter()
        .map(|m| m.content.clone())
        .collect()
}

fn drain_speech(rx: &mut tokio::sync::broadcast::Receiver<SpeechEvent>) -> Vec<SpeechEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Let spawned tasks run without moving past any meaningful deadline
async fn yield_tasks() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

#[tokio::test(start_paused = true)]
async fn test_interleaved_sends_and_switches_stay_isolated() {
    let h = harness();

    let miku_first = h.session.send("slow hello", None).unwrap();
    h.session.switch_persona(Persona::Eva);
    let eva_first = h.session.send("hi eva", None).unwrap();
    h.session.toggle_persona();
    eva_first.await.unwrap();
    miku_first.await.unwrap();

    h.session.switch_persona(Persona::Eva);
    h.session.send("second", None).unwrap().await.unwrap();
    h.session.switch_persona(Persona::Miku);
    h.session.send("again", None).unwrap().await.unwrap();

    assert_eq!(
        contents(&h.session, Persona::Miku),
        vec!["slow hello", "miku says: slow hello", "again", "miku says: again"]
    );
    assert_eq!(
        contents(&h.session, Persona::Eva),
        vec!["hi eva", "eva says: hi eva", "second", "eva says: second"]
    );

    for (persona, conversation) in [Persona::Miku, Persona::Eva]
        .into_iter()
        .map(|p| (p, h.session.conversation(p)))
    {
        let roles: Vec<Role> = conversation.history().iter().map(|m| m.role).collect();
        assert_eq!(
            roles,
            vec![Role::User, Role::Assistant, Role::User, Role::Assistant],
            "roles out of order for {}",
            persona
        );
    }

    let modes: Vec<Persona> = h.service.requests.lock().iter().map(|r| r.mode).collect();
    assert_eq!(modes, vec![Persona::Miku, Persona::Eva, Persona::Eva, Persona::Miku]);
    assert!(h
        .service
        .requests
        .lock()
        .iter()
        .all(|r| r.user_id == "user-test0001"));
}

#[tokio::test(start_paused = true)]
async fn test_answer_for_inactive_persona_is_recorded_but_silent() {
    let h = harness();
    let mut events = h.session.subscribe();

    let request = h.session.send("slow question", None).unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    h.session.switch_persona(Persona::Eva);
    request.await.unwrap();
    yield_tasks().await;

    assert_eq!(
        contents(&h.session, Persona::Miku),
        vec!["slow question", "miku says: slow question"]
    );
    assert!(h.channel.spoken().is_empty());
    assert!(!h.session.player().is_speaking());

    let mut suppressed = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let SessionEvent::SpeechSuppressed { persona } = event {
            suppressed.push(persona);
        }
    }
    assert_eq!(suppressed, vec![Persona::Miku]);
}

#[tokio::test(start_paused = true)]
async fn test_answer_for_active_persona_is_spoken_in_its_language() {
    let h = harness();

    h.session.send("konnichiwa", None).unwrap().await.unwrap();
    yield_tasks().await;

    assert_eq!(h.session.player().speaking_persona(), Some(Persona::Miku));
    let spoken = h.channel.spoken();
    assert!(!spoken.is_empty());
    assert!(spoken.iter().all(|u| u.language == Language::Japanese));
    assert_eq!(
        spoken[0].voice.as_ref().map(|v| v.name.as_str()),
        Some("Kyoko")
    );
}

#[tokio::test(start_paused = true)]
async fn test_switch_silences_speech_immediately() {
    let h = harness();
    let mut speech = h.session.player().subscribe();

    h.session
        .send("Tell me something. Then tell me more.", None)
        .unwrap()
        .await
        .unwrap();
    yield_tasks().await;
    assert!(h.session.player().is_speaking());

    // Sending stops speech first, then the answer starts a queue
    assert_eq!(
        drain_speech(&mut speech),
        vec![
            SpeechEvent::Stopped,
            SpeechEvent::Started { persona: Persona::Miku, units: 2 },
        ]
    );

    assert!(h.session.handle_shortcut(KeyChord::meta('m')));
    assert!(!h.session.player().is_speaking());

    // Long enough for the old queue to have finished
    tokio::time::sleep(Duration::from_secs(30)).await;

    // One from the switch, none from the superseded queue
    assert_eq!(drain_speech(&mut speech), vec![SpeechEvent::Stopped]);
    assert_eq!(h.channel.spoken().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pending_guard_is_per_persona() {
    let h = harness();

    let first = h.session.send("slow one", None).unwrap();
    assert_eq!(
        h.session.send("two", None).unwrap_err(),
        SendRejected::Pending(Persona::Miku)
    );
    let other = h.session.send("three", Some(Persona::Eva)).unwrap();
    assert!(h.session.conversation(Persona::Eva).pending());

    other.await.unwrap();
    first.await.unwrap();

    assert_eq!(h.service.requests.lock().len(), 2);
    assert_eq!(contents(&h.session, Persona::Miku).len(), 2);
    assert!(!h.session.active_pending());
}

#[tokio::test(start_paused = true)]
async fn test_unreachable_backend_becomes_visible_message() {
    let h = harness();

    h.session.send("down", None).unwrap().await.unwrap();
    yield_tasks().await;

    let conversation = h.session.active_conversation();
    let reply = conversation.last_assistant().unwrap();
    assert!(reply.content.starts_with("[ CONNECTION LOST ]"));
    assert!(reply.content.ends_with("connection refused"));
    assert!(!conversation.pending());
    assert!(h.channel.spoken().is_empty());

    // Still usable afterwards
    h.session.send("hello", None).unwrap().await.unwrap();
    assert_eq!(conversation.len() + 2, h.session.active_conversation().len());
}

#[tokio::test(start_paused = true)]
async fn test_rapid_switches_leave_one_notification() {
    let h = harness();
    let notifier = h.session.notifier().clone();

    h.session.switch_persona(Persona::Eva);
    tokio::time::sleep(Duration::from_millis(300)).await;
    h.session.switch_persona(Persona::Miku);
    assert_eq!(notifier.visible(), Some(Persona::Miku));

    tokio::time::sleep(Duration::from_millis(2000)).await;
    assert_eq!(notifier.visible(), Some(Persona::Miku));

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(notifier.visible(), None);
}

#[tokio::test(start_paused = true)]
async fn test_voice_switch_command_does_not_send() {
    let h = harness();
    let capture = Arc::new(ManualCapture::new());
    let recognizer = VoiceCommandRecognizer::new(
        capture.clone(),
        Arc::new(h.session.clone()),
        VoiceInputConfig::default(),
    );

    recognizer
        .open(h.session.active_persona().language())
        .unwrap();
    assert_eq!(capture.language(), Some(Language::Japanese));

    capture.push_interim("let's switch to eva mode please").unwrap();
    capture.finish().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.session.active_persona(), Persona::Eva);
    assert!(h.service.requests.lock().is_empty());
    assert!(h.session.conversation(Persona::Eva).is_empty());
    assert!(!recognizer.is_open());
    assert!(!capture.is_active());
}

#[tokio::test(start_paused = true)]
async fn test_voice_transcript_is_sent_to_active_persona() {
    let h = harness();
    h.session.switch_persona(Persona::Eva);

    let capture = Arc::new(ManualCapture::new());
    let recognizer = VoiceCommandRecognizer::new(
        capture.clone(),
        Arc::new(h.session.clone()),
        VoiceInputConfig::default(),
    );

    recognizer.open(Language::English).unwrap();
    capture.push_interim("what is your favorite song").unwrap();
    capture.finish().unwrap();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(h.session.active_persona(), Persona::Eva);
    assert_eq!(
        contents(&h.session, Persona::Eva),
        vec!["what is your favorite song", "eva says: what is your favorite song"]
    );
    assert!(!recognizer.is_open());
}

#[tokio::test(start_paused = true)]
async fn test_clear_history_reaches_service() {
    let h = harness();
    h.session.send("hi", None).unwrap().await.unwrap();
    h.session.send("hey", Some(Persona::Eva)).unwrap().await.unwrap();

    h.session.clear_history(Some(Persona::Miku)).await.unwrap();
    assert!(h.session.conversation(Persona::Miku).is_empty());
    assert_eq!(h.session.conversation(Persona::Eva).len(), 2);

    h.session.clear_history(None).await.unwrap();
    assert!(h.session.conversation(Persona::Eva).is_empty());
    assert_eq!(*h.service.clears.lock(), vec![Some(Persona::Miku), None]);
}
