//! Spoken response playback.
//!
//! Responses are split into sentences and spoken one at a time with a short
//! pause between them, which keeps long answers intelligible. The underlying
//! synthesizer is an external command (espeak-ng by default); rate and volume
//! map onto its words-per-minute and amplitude arguments.

use crate::audio::CommandExecutor;
use crate::config::AudioConfig;
use crate::defaults::SENTENCE_PAUSE;
use crate::error::Result;
use tracing::debug;

/// espeak-ng's default speaking rate, in words per minute.
const BASE_WPM: f32 = 175.0;

/// espeak-ng's amplitude for full volume (range 0-200).
const BASE_AMPLITUDE: f32 = 100.0;

/// Speaks response text through an external TTS command.
pub struct Speaker<E: CommandExecutor> {
    executor: E,
    command: String,
    rate: f32,
    volume: f32,
}

impl<E: CommandExecutor> Speaker<E> {
    /// Create a speaker from playback configuration.
    pub fn new(executor: E, config: &AudioConfig) -> Self {
        Self {
            executor,
            command: config.tts_command.clone(),
            rate: config.speech_rate,
            volume: config.speech_volume,
        }
    }

    /// Speak a single utterance, blocking until playback finishes.
    pub fn speak(&self, text: &str) -> Result<()> {
        let wpm = (BASE_WPM * self.rate).round() as u32;
        let amplitude = (BASE_AMPLITUDE * self.volume).round() as u32;
        let wpm_arg = wpm.to_string();
        let amplitude_arg = amplitude.to_string();

        debug!(chars = text.len(), wpm, amplitude, "speaking");
        self.executor
            .execute(&self.command, &["-s", &wpm_arg, "-a", &amplitude_arg, text])?;
        Ok(())
    }

    /// Speak `text` sentence by sentence, pausing briefly between sentences.
    ///
    /// Stops at the first playback failure.
    pub async fn speak_sentences(&self, text: &str) -> Result<()> {
        let sentences = split_sentences(text);
        let count = sentences.len();
        for (i, sentence) in sentences.iter().enumerate() {
            self.speak(sentence)?;
            if i + 1 < count {
                tokio::time::sleep(SENTENCE_PAUSE).await;
            }
        }
        Ok(())
    }
}

/// Split text into sentences on `.`, `!` and `?` boundaries.
///
/// A boundary is a terminator followed by whitespace or end of text, so
/// decimals like "3.5" stay intact. Empty fragments are dropped.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        current.push(c);
        if matches!(c, '.' | '!' | '?') {
            let at_boundary = match chars.peek() {
                Some(next) => next.is_whitespace(),
                None => true,
            };
            if at_boundary {
                let sentence = current.trim();
                if !sentence.is_empty() {
                    sentences.push(sentence.to_string());
                }
                current.clear();
            }
        }
    }

    let rest = current.trim();
    if !rest.is_empty() {
        sentences.push(rest.to_string());
    }

    sentences
}
