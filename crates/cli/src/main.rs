//! Terminal front-end
//!
//! Reads commands from stdin, prints both personas' answers and logs speech
//! through [`LoggingSpeechChannel`]. `/voice` feeds a typed utterance through
//! the voice command recognizer as if it had been spoken.

mod commands;

use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use duet_agent::{
    NotificationEvent, PersonaNotifier, SessionConfig, SessionController, SessionEvent,
    VoiceCommandRecognizer, VoiceEvent,
};
use duet_config::{load_settings, Settings};
use duet_core::{AnswerService, Persona, Role};
use duet_llm::{AnswerClient, AnswerClientConfig};
use duet_pipeline::{LoggingSpeechChannel, ManualCapture, PlaybackConfig, SpeechPlayer};

use commands::{parse, Command, HELP};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Priority: env vars > config/{env} > config/default > defaults
    let env = std::env::var("DUET_ENV").ok();
    let settings = match load_settings(env.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            // Tracing not yet initialized
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        }
    };

    init_tracing(&settings);
    tracing::info!("Starting duet v{}", env!("CARGO_PKG_VERSION"));

    let client = AnswerClient::new(AnswerClientConfig::from_settings(&settings.service))?;
    if !client.health().await.unwrap_or(false) {
        tracing::warn!(endpoint = %client.endpoint(), "Answer service is not reachable");
    }

    let channel = Arc::new(LoggingSpeechChannel::with_default_voices());
    let player = SpeechPlayer::new(channel, PlaybackConfig::from_settings(&settings.speech));
    let notifier = PersonaNotifier::from_settings(&settings.notification);
    let session = SessionController::new(
        SessionConfig::from_settings(&settings.service),
        Arc::new(client),
        player,
        notifier,
    );
    tracing::info!(user_id = %session.user_id(), "Session ready");

    let capture = Arc::new(ManualCapture::new());
    let recognizer = VoiceCommandRecognizer::new(
        capture.clone(),
        Arc::new(session.clone()),
        settings.voice_input.clone(),
    );

    spawn_printers(&session, &recognizer);

    println!("{}", HELP);
    print_prompt(session.active_persona());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse(&line) {
            Command::Empty => {}
            Command::Say(text) => {
                if let Err(rejected) = session.send(&text, None) {
                    println!("  ({})", rejected);
                }
            }
            Command::Toggle => {
                session.toggle_persona();
            }
            Command::Switch(persona) => session.switch_persona(persona),
            Command::Stop => session.player().stop(),
            Command::Voice(utterance) => {
                run_voice_turn(&session, &recognizer, &capture, &utterance);
            }
            Command::ToggleSpeech => {
                let enabled = session.player().toggle_enabled();
                println!("  speech {}", if enabled { "on" } else { "off" });
            }
            Command::Replay(index) => {
                if let Err(e) = session.replay(index) {
                    println!("  ({})", e);
                }
            }
            Command::History => print_history(&session),
            Command::Clear { all } => {
                let target = (!all).then(|| session.active_persona());
                match session.clear_history(target).await {
                    Ok(()) => println!("  history cleared"),
                    Err(e) => println!("  ({})", e),
                }
            }
            Command::Help => println!("{}", HELP),
            Command::Quit => break,
            Command::Invalid(message) => println!("  ({})", message),
        }
        print_prompt(session.active_persona());
    }

    recognizer.close();
    session.player().stop();
    tracing::info!("Goodbye");
    Ok(())
}

/// Initialize tracing, console only
fn init_tracing(settings: &Settings) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &settings.observability.log_level;
        format!(
            "duet_cli={0},duet_agent={0},duet_pipeline={0},duet_llm={0},duet_config={0}",
            level
        )
        .into()
    });

    let subscriber = tracing_subscriber::registry().with(env_filter);
    let fmt_layer = if settings.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}

/// Speak `utterance` into the capture device and end the turn
fn run_voice_turn(
    session: &SessionController,
    recognizer: &VoiceCommandRecognizer,
    capture: &ManualCapture,
    utterance: &str,
) {
    // Opening voice input silences the current answer
    session.player().stop();

    if let Err(e) = recognizer.open(session.active_persona().language()) {
        println!("  ({})", e);
        return;
    }
    if let Some(error) = recognizer.session().and_then(|s| s.error) {
        println!("  ({})", error);
        recognizer.close();
        return;
    }

    let fed = capture
        .push_interim(utterance)
        .and_then(|()| capture.finish());
    if let Err(e) = fed {
        tracing::warn!(error = %e, "Voice turn could not be delivered");
        recognizer.close();
    }
}

fn spawn_printers(session: &SessionController, recognizer: &VoiceCommandRecognizer) {
    let mut session_events = session.subscribe();
    let mut notifications = session.notifier().subscribe();
    let mut voice_events = recognizer.subscribe();
    let watched = session.clone();

    tokio::spawn(async move {
        loop {
            tokio::select! {
                Ok(event) = session_events.recv() => match event {
                    SessionEvent::MessageAppended { persona, role: Role::Assistant } => {
                        if let Some(message) = watched.conversation(persona).last_assistant() {
                            println!("\n{}> {}", persona.name(), message.content);
                            print_prompt(watched.active_persona());
                        }
                    }
                    SessionEvent::PendingChanged { persona, pending: true } => {
                        println!("  {} is thinking...", persona.name());
                    }
                    _ => {}
                },
                Ok(event) = notifications.recv() => {
                    if let NotificationEvent::Shown(persona) = event {
                        println!("  ── {} MODE ──", persona.name().to_uppercase());
                    }
                },
                Ok(event) = voice_events.recv() => match event {
                    VoiceEvent::PhaseChanged { new, .. } => println!("  [mic] {}", new.status_text()),
                    VoiceEvent::Transcript(text) => println!("  [mic] \"{}\"", text),
                    VoiceEvent::Error(message) => println!("  [mic] {}", message),
                    VoiceEvent::SwitchCommand(persona) => println!("  [mic] switching to {}", persona.name()),
                    _ => {}
                },
                else => break,
            }
        }
    });
}

fn print_history(session: &SessionController) {
    let conversation = session.active_conversation();
    if conversation.is_empty() {
        println!("  (no messages)");
        return;
    }

    let persona = session.active_persona();
    for (index, message) in conversation.history().iter().enumerate() {
        let speaker = match message.role {
            Role::User => "you",
            Role::Assistant => persona.name(),
        };
        println!("  [{}] {}: {}", index, speaker, message.content);
    }
    if conversation.pending() {
        println!("  ...");
    }
}

fn print_prompt(persona: Persona) {
    println!("{} >", persona.tag());
}
