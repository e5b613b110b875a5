//! vocam - Voice and camera assistant client
//!
//! Speak a request, snap a photo, hear the answer. Recognition runs offline
//! through Vosk when its model is ready and falls back to a scripted
//! simulation while it is not; the request travels to an assistant backend
//! as one text+image upload.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod app;
pub mod audio;
pub mod backend;
pub mod camera;
pub mod cli;
pub mod config;
pub mod defaults;
pub mod engine;
pub mod error;
pub mod models;
pub mod speech;

// Core traits (capture → recognize → ask → speak)
pub use audio::{CommandExecutor, CuePlayer, Speaker, SystemCommandExecutor};
pub use camera::ImageCapture;
pub use engine::{EngineEvent, EngineSession, RecognitionEngine};
pub use speech::SpeechSession;

// Orchestration
pub use app::{AppState, Assistant};
pub use backend::BackendClient;
pub use models::ModelGate;

// Error handling
pub use error::{Result, VocamError};

// Config
pub use config::Config;
