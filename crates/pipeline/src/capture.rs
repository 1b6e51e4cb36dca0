//! Programmatically fed capture device
//!
//! Stands in for a microphone with streaming recognition: the owner pushes
//! interim transcripts and ends the session by hand. The terminal front-end
//! drives it from typed `/voice` commands.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::mpsc;

use duet_core::{CaptureDevice, CaptureEvent, Language, Result};

use crate::PipelineError;

struct CaptureSession {
    language: Language,
    events: mpsc::UnboundedSender<CaptureEvent>,
}

/// Reference [`CaptureDevice`] fed through method calls
pub struct ManualCapture {
    available: AtomicBool,
    session: Mutex<Option<CaptureSession>>,
    starts: AtomicUsize,
    aborts: AtomicUsize,
}

impl ManualCapture {
    pub fn new() -> Self {
        Self {
            available: AtomicBool::new(true),
            session: Mutex::new(None),
            starts: AtomicUsize::new(0),
            aborts: AtomicUsize::new(0),
        }
    }

    /// Device that refuses every start, like a browser without recognition
    pub fn unavailable() -> Self {
        let capture = Self::new();
        capture.available.store(false, Ordering::SeqCst);
        capture
    }

    /// Whether a session currently holds the device
    pub fn is_active(&self) -> bool {
        self.session.lock().is_some()
    }

    /// Language of the current session
    pub fn language(&self) -> Option<Language> {
        self.session.lock().as_ref().map(|s| s.language)
    }

    pub fn start_count(&self) -> usize {
        self.starts.load(Ordering::SeqCst)
    }

    pub fn abort_count(&self) -> usize {
        self.aborts.load(Ordering::SeqCst)
    }

    /// Deliver the full transcript recognised so far
    pub fn push_interim(&self, transcript: impl Into<String>) -> std::result::Result<(), PipelineError> {
        let guard = self.session.lock();
        let session = guard.as_ref().ok_or(PipelineError::NoSession)?;
        session
            .events
            .send(CaptureEvent::Interim(transcript.into()))
            .map_err(|_| PipelineError::ChannelClosed)
    }

    /// End the session normally
    pub fn finish(&self) -> std::result::Result<(), PipelineError> {
        let session = self.session.lock().take().ok_or(PipelineError::NoSession)?;
        session
            .events
            .send(CaptureEvent::End)
            .map_err(|_| PipelineError::ChannelClosed)
    }

    /// End the session with a platform error code
    pub fn fail(&self, code: impl Into<String>) -> std::result::Result<(), PipelineError> {
        let session = self.session.lock().take().ok_or(PipelineError::NoSession)?;
        session
            .events
            .send(CaptureEvent::Error(code.into()))
            .map_err(|_| PipelineError::ChannelClosed)
    }
}

impl Default for ManualCapture {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureDevice for ManualCapture {
    fn start(&self, language: Language, events: mpsc::UnboundedSender<CaptureEvent>) -> Result<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(PipelineError::CaptureUnavailable.into());
        }

        let mut session = self.session.lock();
        if let Some(previous) = session.take() {
            let _ = previous.events.send(CaptureEvent::Error("aborted".to_string()));
        }
        *session = Some(CaptureSession { language, events });
        self.starts.fetch_add(1, Ordering::SeqCst);

        tracing::debug!(lang = language.tag(), "Capture started");
        Ok(())
    }

    fn stop(&self) {
        if let Some(session) = self.session.lock().take() {
            let _ = session.events.send(CaptureEvent::End);
        }
    }

    fn abort(&self) {
        self.aborts.fetch_add(1, Ordering::SeqCst);
        if let Some(session) = self.session.lock().take() {
            let _ = session.events.send(CaptureEvent::Error("aborted".to_string()));
            tracing::debug!("Capture aborted");
        }
    }
}
