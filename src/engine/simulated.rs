//! Scripted fallback recognition strategy.
//!
//! Selected by the session manager whenever the real model is not ready, so
//! the interaction stays usable before (or without) a successful model load.
//! Delivers a fixed sequence of partial hypotheses on a timer and then goes
//! quiet until stopped; the session manager supplies the canned final text on
//! stop. This is a functional stand-in, not an error path.

use crate::defaults::{SIMULATED_DELAYS, SIMULATED_SCRIPT};
use crate::engine::{payload, EngineEvent, EngineSession, EventSender, RecognitionEngine};
use crate::error::Result;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Recognition engine that plays a fixed script instead of decoding audio.
#[derive(Debug, Default)]
pub struct SimulatedEngine;

impl SimulatedEngine {
    pub fn new() -> Self {
        Self
    }
}

impl RecognitionEngine for SimulatedEngine {
    fn load_model(&self, _path: &Path) -> Result<()> {
        // Nothing to load; the script is compiled in.
        Ok(())
    }

    fn start_session(
        &self,
        _sample_rate: u32,
        events: EventSender,
    ) -> Result<Box<dyn EngineSession>> {
        debug!("starting simulated recognition session");
        let stopped = Arc::new(AtomicBool::new(false));
        let stopped_task = Arc::clone(&stopped);

        let task = tokio::spawn(async move {
            for (delay, line) in SIMULATED_DELAYS.iter().zip(SIMULATED_SCRIPT) {
                tokio::time::sleep(*delay).await;
                if stopped_task.load(Ordering::SeqCst) {
                    return;
                }
                // Scripted hypotheses travel the same payload path as real ones.
                if events
                    .send(EngineEvent::Partial(payload::encode_partial(line)))
                    .is_err()
                {
                    return;
                }
            }
            // Script exhausted: stay silent until the session is stopped.
        });

        Ok(Box::new(SimulatedSession {
            stopped,
            task: Some(task),
        }))
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

struct SimulatedSession {
    stopped: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl EngineSession for SimulatedSession {
    fn stop(&mut self) {
        self.stopped.store(true, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for SimulatedSession {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::event_channel;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn emits_scripted_partials_on_schedule() {
        let engine = SimulatedEngine::new();
        let (tx, mut rx) = event_channel();
        let _session = engine.start_session(16000, tx).unwrap();

        tokio::time::advance(Duration::from_millis(1000)).await;
        let ev = rx.recv().await.unwrap();
        assert_eq!(
            ev,
            EngineEvent::Partial(payload::encode_partial("Hello"))
        );

        tokio::time::advance(Duration::from_millis(1000)).await;
        let ev = rx.recv().await.unwrap();
        assert_eq!(
            ev,
            EngineEvent::Partial(payload::encode_partial("Hello, can you"))
        );

        tokio::time::advance(Duration::from_millis(500)).await;
        let ev = rx.recv().await.unwrap();
        assert_eq!(
            ev,
            EngineEvent::Partial(payload::encode_partial("Hello, can you help me"))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn goes_quiet_after_the_script() {
        let engine = SimulatedEngine::new();
        let (tx, mut rx) = event_channel();
        let _session = engine.start_session(16000, tx).unwrap();

        for _ in 0..3 {
            assert!(matches!(
                rx.recv().await.unwrap(),
                EngineEvent::Partial(_)
            ));
        }

        // No further events arrive, however long we wait.
        let waited = tokio::time::timeout(Duration::from_secs(60), rx.recv()).await;
        assert!(waited.is_err() || waited.unwrap().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_halts_the_script() {
        let engine = SimulatedEngine::new();
        let (tx, mut rx) = event_channel();
        let mut session = engine.start_session(16000, tx).unwrap();

        tokio::time::advance(Duration::from_millis(1000)).await;
        assert!(rx.recv().await.is_some());

        session.stop();
        tokio::time::advance(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent() {
        let engine = SimulatedEngine::new();
        let (tx, _rx) = event_channel();
        let mut session = engine.start_session(16000, tx).unwrap();
        session.stop();
        session.stop();
    }

    #[test]
    fn load_model_is_a_no_op() {
        let engine = SimulatedEngine::new();
        assert!(engine.load_model(Path::new("/nowhere")).is_ok());
    }
}
