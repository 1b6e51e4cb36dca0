//! Speech output and audio capture interfaces

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::{Language, Result, Utterance, VoiceInfo};

/// Platform speech output channel
///
/// The channel is exclusive: the playback engine is its only user and
/// always cancels before enqueueing a new sequence.
#[async_trait]
pub trait SpeechChannel: Send + Sync + 'static {
    /// Speak one utterance, resolving when it ends
    ///
    /// # Returns
    /// * `Ok(())` when the utterance finished playing
    /// * `Err(Error::Interrupted)` when [`cancel_all`](Self::cancel_all) cut it short
    /// * `Err(Error::Synthesis)` when the utterance could not be rendered
    async fn speak(&self, utterance: Utterance) -> Result<()>;

    /// Pause output (used by the keepalive cycle)
    fn pause(&self);

    /// Resume paused output
    fn resume(&self);

    /// Drop everything queued or playing
    fn cancel_all(&self);

    /// Whether audio is currently being produced
    fn is_speaking(&self) -> bool;

    /// Voices installed on the platform
    fn voices(&self) -> Vec<VoiceInfo>;
}

/// Event delivered by a capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptureEvent {
    /// Full transcript recognised so far (replaces the previous interim)
    Interim(String),
    /// Capture session ended normally
    End,
    /// Capture failed with a platform error code (e.g. `"no-speech"`, `"aborted"`)
    Error(String),
}

/// Exclusive audio capture device with speech recognition
///
/// A session is started with [`start`](Self::start) and reports through the
/// supplied sender. After `End` or `Error` the session is over.
pub trait CaptureDevice: Send + Sync + 'static {
    /// Begin a capture session in `language`
    ///
    /// Returns [`crate::Error::CapabilityUnavailable`] when no device can be
    /// acquired.
    fn start(&self, language: Language, events: mpsc::UnboundedSender<CaptureEvent>) -> Result<()>;

    /// Finish gracefully; the device delivers its final transcript then `End`
    fn stop(&self);

    /// Abandon the session and release the device. Safe to call in any phase.
    fn abort(&self);
}
