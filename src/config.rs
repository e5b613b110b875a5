//! Configuration loading and defaults.

use crate::defaults;
use crate::error::{Result, VocamError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub speech: SpeechConfig,
    pub backend: BackendConfig,
    pub audio: AudioConfig,
    pub camera: CameraConfig,
}

/// Speech recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SpeechConfig {
    /// Model directory name, resolved inside the asset and model directories.
    pub model: String,
    /// Directory holding bundled model assets. Defaults to `./assets`.
    pub asset_dir: PathBuf,
    pub sample_rate: u32,
}

/// Assistant backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    pub url: String,
    pub timeout_secs: u64,
}

/// Response playback configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    /// TTS command invoked for each sentence (e.g. espeak-ng, say, piper).
    pub tts_command: String,
    pub speech_rate: f32,
    pub speech_volume: f32,
    /// Tone player command for listening cues; empty disables cues.
    pub cue_command: String,
}

/// Image capture configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Capture command; receives the output JPEG path as its last argument.
    pub capture_command: String,
    /// Extra arguments passed before the output path.
    pub capture_args: Vec<String>,
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_MODEL.to_string(),
            asset_dir: PathBuf::from("assets"),
            sample_rate: defaults::SAMPLE_RATE,
        }
    }
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            url: defaults::DEFAULT_BACKEND_URL.to_string(),
            timeout_secs: defaults::BACKEND_TIMEOUT_SECS,
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            tts_command: "espeak-ng".to_string(),
            speech_rate: defaults::SPEECH_RATE,
            speech_volume: defaults::SPEECH_VOLUME,
            cue_command: String::new(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            capture_command: "fswebcam".to_string(),
            capture_args: vec!["--no-banner".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VocamError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                VocamError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if the file doesn't exist
    ///
    /// Only returns defaults if the file is missing; invalid TOML is an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(VocamError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOCAM_MODEL → speech.model
    /// - VOCAM_BACKEND_URL → backend.url
    /// - VOCAM_TTS_COMMAND → audio.tts_command
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(model) = std::env::var("VOCAM_MODEL") {
            if !model.is_empty() {
                self.speech.model = model;
            }
        }

        if let Ok(url) = std::env::var("VOCAM_BACKEND_URL") {
            if !url.is_empty() {
                self.backend.url = url;
            }
        }

        if let Ok(tts) = std::env::var("VOCAM_TTS_COMMAND") {
            if !tts.is_empty() {
                self.audio.tts_command = tts;
            }
        }

        self
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/vocam/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join("vocam")
            .join("config.toml")
    }
}
