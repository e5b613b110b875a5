//! Default configuration constants for vocam.
//!
//! Shared constants used across configuration types and the speech session,
//! kept in one place to ensure consistency.

use std::time::Duration;

/// Default audio sample rate in Hz.
///
/// 16kHz is the standard for speech recognition and provides a good balance
/// between quality and computational efficiency for voice applications.
pub const SAMPLE_RATE: u32 = 16000;

/// Default recognition model name.
///
/// The small English Vosk model ships as a bundled asset directory and is
/// copied to the writable model directory on first use.
pub const DEFAULT_MODEL: &str = "vosk-model-small-en-us-0.15";

/// Default backend base URL for text+image requests.
pub const DEFAULT_BACKEND_URL: &str = "http://52.160.88.93";

/// Backend endpoint path for assistant requests.
pub const BACKEND_ENDPOINT: &str = "/navigate";

/// Default backend request timeout in seconds.
pub const BACKEND_TIMEOUT_SECS: u64 = 60;

/// Scripted partial hypotheses delivered when the model is not ready.
///
/// Keeps the interaction usable while the real model is still loading
/// (or failed to load). Each line replaces the previous one, mirroring how
/// a live engine refines its hypothesis.
pub const SIMULATED_SCRIPT: [&str; 3] = ["Hello", "Hello, can you", "Hello, can you help me"];

/// Delays before each scripted partial hypothesis.
pub const SIMULATED_DELAYS: [Duration; 3] = [
    Duration::from_millis(1000),
    Duration::from_millis(1000),
    Duration::from_millis(500),
];

/// Canned result returned when a simulated session is stopped.
pub const SIMULATED_FALLBACK: &str = "Hello, can you help me with this image";

/// Default speech rate multiplier for response playback.
pub const SPEECH_RATE: f32 = 1.0;

/// Default speech volume (0.0 to 1.0) for response playback.
pub const SPEECH_VOLUME: f32 = 1.0;

/// Pause between spoken sentences during response playback.
///
/// A short gap keeps multi-sentence answers intelligible without making
/// playback feel sluggish.
pub const SENTENCE_PAUSE: Duration = Duration::from_millis(200);
