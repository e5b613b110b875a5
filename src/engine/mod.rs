//! Recognition engine abstraction.
//!
//! The speech session drives a [`RecognitionEngine`] through a narrow seam:
//! load a model, open a streaming session, receive events, stop. Real engines
//! (Vosk) and the scripted fallback implement the same trait, so the session
//! logic never branches on which one is active.

pub mod payload;
pub mod simulated;

#[cfg(feature = "vosk")]
pub mod vosk;

use crate::error::Result;
use std::path::Path;
use tokio::sync::mpsc;

/// One recognition event, as delivered by an engine.
///
/// `Partial` and `Final` carry the engine's raw textual payload (a key-value
/// record, JSON for Vosk); the session extracts text through
/// [`payload::partial_text`] / [`payload::final_text`] so a malformed payload
/// degrades to empty text instead of failing the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// In-progress hypothesis; may change or be superseded.
    Partial(String),
    /// A settled transcription segment.
    Final(String),
    /// Engine failure. Terminal for the session.
    Error(String),
    /// The engine detected an input timeout. Non-terminal while listening.
    Timeout,
}

/// Sender half of an engine event stream.
///
/// Unbounded: engines deliver events from their own callback context and must
/// never block on the session consuming them.
pub type EventSender = mpsc::UnboundedSender<EngineEvent>;

/// Receiver half of an engine event stream.
pub type EventReceiver = mpsc::UnboundedReceiver<EngineEvent>;

/// Creates a connected event channel for one engine session.
pub fn event_channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}

/// A speech recognition engine.
///
/// Implementations must deliver events in the order produced by the audio
/// stream. `load_model` is idempotent; engines that need no model (the
/// simulated strategy) treat it as a no-op.
pub trait RecognitionEngine: Send + Sync {
    /// Open the model at `path`. Called once by the model gate after the
    /// assets are installed.
    fn load_model(&self, path: &Path) -> Result<()>;

    /// Start a streaming recognition session.
    ///
    /// Events are pushed into `events` from an engine-managed context until
    /// the returned handle is stopped or the engine fails.
    fn start_session(&self, sample_rate: u32, events: EventSender)
        -> Result<Box<dyn EngineSession>>;

    /// Human-readable engine name for logging.
    fn name(&self) -> &str;
}

/// Handle for one open engine session.
///
/// `stop` must be idempotent and safe to call while events are still in
/// flight; the engine either emits a terminal event afterwards or simply
/// goes quiet.
pub trait EngineSession: Send {
    fn stop(&mut self);
}
