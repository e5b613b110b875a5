//! Error types for vocam.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VocamError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Model errors
    #[error("Model assets not found at {path}")]
    ModelAssetsNotFound { path: String },

    #[error("Model installation failed: {message}")]
    ModelInstall { message: String },

    #[error("Model not ready")]
    ModelNotReady,

    // Recognition engine errors
    #[error("Failed to start recognition: {message}")]
    EngineStart { message: String },

    // Backend errors
    #[error("Backend request failed: {0}")]
    Backend(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    BackendStatus { status: u16, body: String },

    #[error("Backend response missing output: {message}")]
    BackendResponse { message: String },

    // Audio playback errors
    #[error("Speech playback tool not found: {tool}")]
    SpeakerToolNotFound { tool: String },

    #[error("Speech playback failed: {message}")]
    Playback { message: String },

    // Camera errors
    #[error("Image capture failed: {message}")]
    Capture { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VocamError>;
