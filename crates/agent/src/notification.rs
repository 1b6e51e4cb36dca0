//! Persona switch notification
//!
//! Each switch shows a transient notification that dismisses itself after a
//! fixed interval. A new switch replaces the visible notification and
//! restarts the timer, so a burst of switches leaves exactly one
//! notification (for the final persona) and exactly one dismissal.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use duet_config::NotificationConfig;
use duet_core::{Epoch, EpochToken, Persona};

/// Notification lifecycle, for the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationEvent {
    Shown(Persona),
    Dismissed(Persona),
}

#[derive(Default)]
struct NotifierState {
    visible: Option<Persona>,
    timer: Option<JoinHandle<()>>,
}

struct NotifierInner {
    display: Duration,
    epoch: Epoch,
    state: Mutex<NotifierState>,
    event_tx: broadcast::Sender<NotificationEvent>,
}

/// Shows persona switch notifications with a resettable dismiss timer
#[derive(Clone)]
pub struct PersonaNotifier {
    inner: Arc<NotifierInner>,
}

impl PersonaNotifier {
    pub fn new(display: Duration) -> Self {
        let (event_tx, _) = broadcast::channel(32);
        Self {
            inner: Arc::new(NotifierInner {
                display,
                epoch: Epoch::new(),
                state: Mutex::new(NotifierState::default()),
                event_tx,
            }),
        }
    }

    pub fn from_settings(settings: &NotificationConfig) -> Self {
        Self::new(settings.display())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NotificationEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Currently visible notification
    pub fn visible(&self) -> Option<Persona> {
        self.inner.state.lock().visible
    }

    /// Show a notification for `persona`, replacing any visible one
    pub fn show(&self, persona: Persona) {
        {
            let mut state = self.inner.state.lock();
            let token = self.inner.epoch.advance();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.visible = Some(persona);
            state.timer = Some(self.spawn_dismiss(token));
        }
        let _ = self.inner.event_tx.send(NotificationEvent::Shown(persona));
    }

    /// Dismiss immediately
    pub fn dismiss(&self) {
        let dismissed = {
            let mut state = self.inner.state.lock();
            self.inner.epoch.invalidate();
            if let Some(timer) = state.timer.take() {
                timer.abort();
            }
            state.visible.take()
        };
        if let Some(persona) = dismissed {
            let _ = self.inner.event_tx.send(NotificationEvent::Dismissed(persona));
        }
    }

    fn spawn_dismiss(&self, token: EpochToken) -> JoinHandle<()> {
        let inner = Arc::clone(&self.inner);
        tokio::spawn(async move {
            tokio::time::sleep(inner.display).await;
            inner.expire(&token);
        })
    }
}

impl NotifierInner {
    fn expire(&self, token: &EpochToken) {
        let dismissed = {
            let mut state = self.state.lock();
            if !token.is_current() {
                return;
            }
            state.timer = None;
            state.visible.take()
        };
        if let Some(persona) = dismissed {
            let _ = self.event_tx.send(NotificationEvent::Dismissed(persona));
        }
    }
}
