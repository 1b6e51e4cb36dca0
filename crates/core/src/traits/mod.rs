//! Collaborator traits
//!
//! The client orchestrates three external collaborators, each behind a trait
//! so that backends can be swapped and tests can use mocks:
//!
//! ```text
//!   - AnswerService: question → persona answer (remote HTTP service)
//!   - SpeechChannel: utterance → audible speech, with pause/resume/cancel
//!   - CaptureDevice: microphone → interim transcripts → end or error code
//! ```

mod answer;
mod speech;

pub use answer::{AnswerRequest, AnswerResponse, AnswerService};
pub use speech::{CaptureDevice, CaptureEvent, SpeechChannel};
