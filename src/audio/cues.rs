//! Listening cues.
//!
//! Short earcons mark the start and end of a listening window so the user
//! knows when the microphone is live without looking at a screen. Cues are
//! best-effort: a missing or failing player is logged and never interrupts
//! the interaction.

use crate::audio::CommandExecutor;
use tracing::warn;

/// The two earcons the interaction loop emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
    StartListening,
    StopListening,
}

impl Cue {
    /// Argument passed to the cue player to select the sound.
    fn arg(self) -> &'static str {
        match self {
            Cue::StartListening => "start-listening",
            Cue::StopListening => "stop-listening",
        }
    }
}

/// Plays earcons through an optional external command.
///
/// The command receives the cue name as its only argument. An empty command
/// disables cues entirely.
pub struct CuePlayer<E: CommandExecutor> {
    executor: E,
    command: Option<String>,
}

impl<E: CommandExecutor> CuePlayer<E> {
    /// Create a player; an empty `command` disables playback.
    pub fn new(executor: E, command: &str) -> Self {
        let command = if command.is_empty() {
            None
        } else {
            Some(command.to_string())
        };
        Self { executor, command }
    }

    /// Play a cue. Failures are logged, never propagated.
    pub fn play(&self, cue: Cue) {
        let Some(command) = &self.command else {
            return;
        };
        if let Err(e) = self.executor.execute(command, &[cue.arg()]) {
            warn!(cue = cue.arg(), error = %e, "cue playback failed");
        }
    }
}
