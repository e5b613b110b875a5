//! Command-line interface for vocam
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Voice and camera assistant client
#[derive(Parser, Debug)]
#[command(name = "vocam", version, about = "Voice and camera assistant client")]
pub struct Cli {
    /// Subcommand to execute (default: run the interaction loop)
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Suppress output (quiet mode)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose output (-v: debug, -vv: trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Recognition model override (e.g. vosk-model-small-en-us-0.15)
    #[arg(long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Backend base URL override
    #[arg(long, value_name = "URL")]
    pub backend_url: Option<String>,

    /// Serve a fixed image file instead of capturing from the camera
    #[arg(long, value_name = "FILE")]
    pub image: Option<PathBuf>,

    /// Force simulated recognition even when the model is installed
    #[arg(long)]
    pub simulate: bool,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the interaction loop: photo, listen, ask, speak (default)
    Run,

    /// Listen once and print the recognized text without contacting the backend
    Listen,

    /// Send a typed request with an image, bypassing speech recognition
    Ask {
        /// Request text
        text: String,

        /// Image file to attach
        #[arg(long, value_name = "FILE")]
        image: PathBuf,
    },

    /// Manage recognition models
    Models {
        /// Action to perform
        #[command(subcommand)]
        action: ModelsAction,
    },
}

/// Model management actions
#[derive(Subcommand, Debug)]
pub enum ModelsAction {
    /// Copy bundled model assets into the model directory
    Install,
    /// Print the installed path of the configured model
    Path,
}
