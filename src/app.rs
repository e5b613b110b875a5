//! Assistant application entry point.
//!
//! Orchestrates one complete interaction:
//! capture photo → listen → ask backend → speak response
//!
//! The loop always returns to `Ready`: any failure is spoken as a short
//! apology and the next interaction can start immediately.

use crate::audio::{CommandExecutor, Cue, CuePlayer, Speaker, SystemCommandExecutor};
use crate::backend::BackendClient;
use crate::camera::{CommandCamera, FileCamera, ImageCapture};
use crate::config::Config;
use crate::engine::RecognitionEngine;
use crate::error::Result;
use crate::models::ModelGate;
use crate::speech::SpeechSession;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Phrase spoken when an interaction fails.
const ERROR_PHRASE: &str = "Sorry, something went wrong. Please try again.";

/// Observable phase of the interaction loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    /// Waiting for the user to start an interaction.
    Ready,
    /// Microphone is live; partial hypotheses are streaming in.
    Recording,
    /// Request sent to the backend, waiting for the answer.
    Processing,
    /// Speaking the backend's answer.
    Playing,
    /// An interaction failed; transient, resolves back to `Ready`.
    Error,
}

impl std::fmt::Display for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AppState::Ready => "ready",
            AppState::Recording => "recording",
            AppState::Processing => "processing",
            AppState::Playing => "playing",
            AppState::Error => "error",
        };
        f.write_str(label)
    }
}

/// Drives the capture → listen → ask → speak loop.
pub struct Assistant<E: CommandExecutor> {
    session: SpeechSession,
    backend: BackendClient,
    camera: Box<dyn ImageCapture>,
    speaker: Speaker<E>,
    cues: CuePlayer<E>,
    image_path: PathBuf,
    state: Mutex<AppState>,
}

impl<E: CommandExecutor> Assistant<E> {
    pub fn new(
        session: SpeechSession,
        backend: BackendClient,
        camera: Box<dyn ImageCapture>,
        speaker: Speaker<E>,
        cues: CuePlayer<E>,
        image_path: PathBuf,
    ) -> Self {
        Self {
            session,
            backend,
            camera,
            speaker,
            cues,
            image_path,
            state: Mutex::new(AppState::Ready),
        }
    }

    /// Handle to the speech session, for stopping from another task.
    pub fn session(&self) -> SpeechSession {
        self.session.clone()
    }

    /// Current phase of the interaction loop.
    pub fn state(&self) -> AppState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: AppState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = state;
    }

    /// Run one interaction end to end.
    ///
    /// Listening continues until [`SpeechSession::stop_listening`] is called
    /// on a session handle or the engine delivers a terminal event. Returns
    /// the spoken response text, or `None` when nothing was heard.
    pub async fn run_interaction<P>(&self, on_partial: P) -> Result<Option<String>>
    where
        P: Fn(&str) + Send + Sync + 'static,
    {
        self.set_state(AppState::Recording);

        if let Err(e) = self.camera.capture(&self.image_path).await {
            return self.fail(e).await;
        }

        self.cues.play(Cue::StartListening);
        let heard = self
            .session
            .start_listening(on_partial, |message| {
                warn!(message, "recognition error");
            })
            .await;
        self.cues.play(Cue::StopListening);

        let Some(heard) = heard else {
            info!("nothing heard; returning to ready");
            self.set_state(AppState::Ready);
            return Ok(None);
        };

        info!(text = %heard, "request recognized");
        self.set_state(AppState::Processing);
        let response = match self.backend.ask(&heard, &self.image_path).await {
            Ok(response) => response,
            Err(e) => return self.fail(e).await,
        };

        self.set_state(AppState::Playing);
        if let Err(e) = self.speaker.speak_sentences(&response).await {
            // The answer was received; a playback failure is not fatal.
            warn!(error = %e, "response playback failed");
        }

        self.set_state(AppState::Ready);
        Ok(Some(response))
    }

    /// Speak the apology, log the cause, return to `Ready`.
    async fn fail(&self, cause: crate::error::VocamError) -> Result<Option<String>> {
        error!(error = %cause, "interaction failed");
        self.set_state(AppState::Error);
        if let Err(e) = self.speaker.speak_sentences(ERROR_PHRASE).await {
            warn!(error = %e, "could not speak error message");
        }
        self.set_state(AppState::Ready);
        Err(cause)
    }
}

#[cfg(feature = "vosk")]
fn build_engine() -> Arc<dyn RecognitionEngine> {
    use crate::engine::vosk::{arecord_feed_factory, VoskEngine};
    Arc::new(VoskEngine::new(arecord_feed_factory()))
}

#[cfg(not(feature = "vosk"))]
fn build_engine() -> Arc<dyn RecognitionEngine> {
    Arc::new(crate::engine::simulated::SimulatedEngine::new())
}

/// Build a fully wired assistant from configuration.
///
/// With `simulate` the model is never loaded and every episode runs the
/// scripted strategy. `image_override` swaps the camera for a fixed file.
pub fn build_assistant(
    config: &Config,
    simulate: bool,
    image_override: Option<PathBuf>,
) -> Result<Assistant<Arc<SystemCommandExecutor>>> {
    let engine = build_engine();
    let gate = if simulate {
        info!("simulated recognition forced; model load skipped");
        ModelGate::unready()
    } else {
        ModelGate::spawn_load(
            engine.clone(),
            config.speech.asset_dir.clone(),
            config.speech.model.clone(),
        )
    };
    let session = SpeechSession::new(engine, gate, config.speech.sample_rate);

    let backend = BackendClient::new(
        &config.backend.url,
        Duration::from_secs(config.backend.timeout_secs),
    )?;

    let camera: Box<dyn ImageCapture> = match image_override {
        Some(path) => Box::new(FileCamera::new(path)),
        None => Box::new(CommandCamera::new(&config.camera)),
    };

    let executor = Arc::new(SystemCommandExecutor::new());
    let speaker = Speaker::new(executor.clone(), &config.audio);
    let cues = CuePlayer::new(executor, &config.audio.cue_command);

    let image_path = std::env::temp_dir().join("vocam-capture.jpg");
    Ok(Assistant::new(
        session, backend, camera, speaker, cues, image_path,
    ))
}

/// Forward each line typed on stdin as one "enter pressed" signal.
///
/// stdin reads block, so they live on their own thread; the channel closes
/// on EOF (Ctrl-D).
fn spawn_enter_reader() -> mpsc::UnboundedReceiver<()> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            if line.is_err() || tx.send(()).is_err() {
                break;
            }
        }
    });
    rx
}

/// Run the interaction loop until stdin closes.
///
/// Enter starts an interaction, Enter again stops listening; everything in
/// between is driven by [`Assistant::run_interaction`].
pub async fn run_loop(
    config: Config,
    simulate: bool,
    image_override: Option<PathBuf>,
    quiet: bool,
) -> Result<()> {
    let assistant = Arc::new(build_assistant(&config, simulate, image_override)?);
    let mut enter = spawn_enter_reader();

    loop {
        if !quiet {
            if assistant.session.is_model_ready() {
                eprintln!("Press Enter to ask (Ctrl-D to quit).");
            } else {
                eprintln!("Press Enter to ask (model still loading; responses are simulated).");
            }
        }
        if enter.recv().await.is_none() {
            break;
        }
        if !quiet {
            eprintln!("Listening... press Enter to stop.");
        }

        let show_partials = !quiet;
        let interaction = assistant.run_interaction(move |partial| {
            if show_partials {
                eprintln!("  {partial}");
            }
        });
        tokio::pin!(interaction);

        let outcome = loop {
            tokio::select! {
                result = &mut interaction => break result,
                pressed = enter.recv() => {
                    assistant.session.stop_listening();
                    if pressed.is_none() {
                        // stdin closed mid-episode; let it finish, then quit.
                        break (&mut interaction).await;
                    }
                }
            }
        };

        match outcome {
            Ok(Some(response)) => {
                if !quiet {
                    println!("{response}");
                }
            }
            Ok(None) => {
                if !quiet {
                    eprintln!("Nothing heard.");
                }
            }
            // Already spoken and logged; the loop continues.
            Err(_) => {}
        }
    }

    Ok(())
}

/// Listen for one episode and print the recognized text. No backend call.
pub async fn run_listen(config: Config, simulate: bool, quiet: bool) -> Result<()> {
    let engine = build_engine();
    let gate = if simulate {
        ModelGate::unready()
    } else {
        ModelGate::spawn_load(
            engine.clone(),
            config.speech.asset_dir.clone(),
            config.speech.model.clone(),
        )
    };
    let session = SpeechSession::new(engine, gate, config.speech.sample_rate);

    let mut enter = spawn_enter_reader();
    if !quiet {
        eprintln!("Listening... press Enter to stop.");
    }

    let show_partials = !quiet;
    let stopper = session.clone();
    let listener = session.start_listening(
        move |partial| {
            if show_partials {
                eprintln!("  {partial}");
            }
        },
        |message| warn!(message, "recognition error"),
    );
    tokio::pin!(listener);

    let heard = loop {
        tokio::select! {
            result = &mut listener => break result,
            _ = enter.recv() => {
                stopper.stop_listening();
                break (&mut listener).await;
            }
        }
    };

    match heard {
        Some(text) => println!("{text}"),
        None => {
            if !quiet {
                eprintln!("Nothing heard.");
            }
        }
    }
    Ok(())
}
