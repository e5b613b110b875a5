//! Vosk recognition engine adapter.
//!
//! Wraps the offline Vosk decoder behind [`RecognitionEngine`]. Audio capture
//! is supplied through a [`SampleFeed`] factory so the decode loop stays
//! independent of any particular capture backend; the feed blocks on its own
//! thread, never on the async runtime.
//!
//! Requires libvosk at link time; the module is compiled only with the `vosk`
//! feature enabled.

use crate::engine::{payload, EngineEvent, EngineSession, EventSender, RecognitionEngine};
use crate::error::{Result, VocamError};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, warn};

/// Blocking source of 16-bit mono PCM chunks.
///
/// `next_chunk` returns `None` when the capture stream ends.
pub trait SampleFeed: Send {
    fn next_chunk(&mut self) -> Option<Vec<i16>>;
}

/// Factory producing a fresh feed per session, given the sample rate.
pub type FeedFactory = Box<dyn Fn(u32) -> Result<Box<dyn SampleFeed>> + Send + Sync>;

/// Recognition engine backed by a Vosk model on disk.
pub struct VoskEngine {
    model_dir: Mutex<Option<PathBuf>>,
    feed_factory: FeedFactory,
}

impl VoskEngine {
    pub fn new(feed_factory: FeedFactory) -> Self {
        Self {
            model_dir: Mutex::new(None),
            feed_factory,
        }
    }
}

impl RecognitionEngine for VoskEngine {
    fn load_model(&self, path: &Path) -> Result<()> {
        // Open once to validate, then remember the path. The decode thread
        // re-opens the model locally; Vosk handles are not shared across
        // threads.
        let dir = path.to_string_lossy().into_owned();
        if vosk::Model::new(&dir).is_none() {
            return Err(VocamError::ModelAssetsNotFound {
                path: dir.clone(),
            });
        }
        debug!(path = %dir, "vosk model validated");
        *self
            .model_dir
            .lock()
            .map_err(|_| VocamError::Other("model state poisoned".to_string()))? =
            Some(path.to_path_buf());
        Ok(())
    }

    fn start_session(
        &self,
        sample_rate: u32,
        events: EventSender,
    ) -> Result<Box<dyn EngineSession>> {
        let model_dir = self
            .model_dir
            .lock()
            .map_err(|_| VocamError::Other("model state poisoned".to_string()))?
            .clone()
            .ok_or(VocamError::ModelNotReady)?;

        let feed = (self.feed_factory)(sample_rate)?;
        let stopped = Arc::new(AtomicBool::new(false));
        let stopped_thread = Arc::clone(&stopped);

        // Decode on a dedicated thread: accept_waveform blocks per chunk and
        // the feed blocks on capture.
        std::thread::spawn(move || {
            decode_loop(model_dir, sample_rate, feed, events, stopped_thread);
        });

        Ok(Box::new(VoskSession { stopped }))
    }

    fn name(&self) -> &str {
        "vosk"
    }
}

fn decode_loop(
    model_dir: PathBuf,
    sample_rate: u32,
    mut feed: Box<dyn SampleFeed>,
    events: EventSender,
    stopped: Arc<AtomicBool>,
) {
    let dir = model_dir.to_string_lossy().into_owned();
    let Some(model) = vosk::Model::new(&dir) else {
        let _ = events.send(EngineEvent::Error(format!(
            "failed to open vosk model at {dir}"
        )));
        return;
    };
    let Some(mut recognizer) = vosk::Recognizer::new(&model, sample_rate as f32) else {
        let _ = events.send(EngineEvent::Error(
            "failed to create vosk recognizer".to_string(),
        ));
        return;
    };

    let mut last_partial = String::new();
    while !stopped.load(Ordering::SeqCst) {
        let Some(chunk) = feed.next_chunk() else {
            break;
        };
        match recognizer.accept_waveform(&chunk) {
            vosk::DecodingState::Finalized => {
                let text = match recognizer.result().single() {
                    Some(r) => r.text.to_string(),
                    None => {
                        warn!("vosk returned a non-single final result");
                        String::new()
                    }
                };
                last_partial.clear();
                if events
                    .send(EngineEvent::Final(payload::encode_final(&text)))
                    .is_err()
                {
                    return;
                }
            }
            vosk::DecodingState::Running => {
                let partial = recognizer.partial_result().partial.to_string();
                if partial != last_partial {
                    last_partial = partial.clone();
                    if events
                        .send(EngineEvent::Partial(payload::encode_partial(&partial)))
                        .is_err()
                    {
                        return;
                    }
                }
            }
            vosk::DecodingState::Failed => {
                let _ = events.send(EngineEvent::Error("vosk decoding failed".to_string()));
                return;
            }
        }
    }

    // Flush whatever the decoder still holds as a last final segment.
    let text = recognizer
        .final_result()
        .single()
        .map(|r| r.text.to_string())
        .unwrap_or_default();
    let _ = events.send(EngineEvent::Final(payload::encode_final(&text)));
}

struct VoskSession {
    stopped: Arc<AtomicBool>,
}

impl EngineSession for VoskSession {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
    }
}

/// Samples per chunk handed to the decoder: 100ms at 16kHz.
const CHUNK_SAMPLES: usize = 1600;

/// Feed reading raw signed 16-bit little-endian PCM from a capture command.
///
/// Spawned per session; the child is killed when the feed is dropped.
pub struct CommandFeed {
    child: Child,
    stdout: ChildStdout,
}

impl CommandFeed {
    /// Spawn `arecord` capturing mono S16_LE at `sample_rate`.
    pub fn arecord(sample_rate: u32) -> Result<Self> {
        let rate = sample_rate.to_string();
        let mut child = Command::new("arecord")
            .args(["-q", "-f", "S16_LE", "-c", "1", "-t", "raw", "-r", &rate])
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| VocamError::EngineStart {
                message: format!("failed to spawn arecord: {e}"),
            })?;
        let stdout = child.stdout.take().ok_or_else(|| VocamError::EngineStart {
            message: "arecord produced no stdout pipe".to_string(),
        })?;
        Ok(Self { child, stdout })
    }
}

impl SampleFeed for CommandFeed {
    fn next_chunk(&mut self) -> Option<Vec<i16>> {
        let mut buf = vec![0u8; CHUNK_SAMPLES * 2];
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) => {
                    warn!(error = %e, "capture read failed");
                    return None;
                }
            }
        }
        if filled == 0 {
            return None;
        }
        let samples = buf[..filled - filled % 2]
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Some(samples)
    }
}

impl Drop for CommandFeed {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// Factory spawning one `arecord` capture per session.
pub fn arecord_feed_factory() -> FeedFactory {
    Box::new(|sample_rate| {
        let feed = CommandFeed::arecord(sample_rate)?;
        Ok(Box::new(feed) as Box<dyn SampleFeed>)
    })
}
