//! Speech session lifecycle management.
//!
//! [`SpeechSession`] owns one listening episode at a time: it opens an engine
//! session, folds the engine's event stream into accumulated text, surfaces
//! live partial hypotheses to the caller, and delivers exactly one result per
//! episode: on a terminal engine event, on an explicit stop, or when the
//! waiting caller is cancelled.
//!
//! Engine events arrive on a pump task, so every piece of shared session
//! state sits behind one mutex and the pending result is a one-shot sender
//! taken atomically with delivery: a second fulfillment attempt finds the
//! slot empty and becomes a no-op. Caller callbacks are always invoked with
//! the lock released.

use crate::defaults::SIMULATED_FALLBACK;
use crate::engine::simulated::SimulatedEngine;
use crate::engine::{event_channel, payload, EngineEvent, EngineSession, EventReceiver, RecognitionEngine};
use crate::models::ModelGate;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

type PartialCallback = Arc<dyn Fn(&str) + Send + Sync>;
type ErrorCallback = Arc<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    Listening,
    Stopping,
    Completed,
}

/// Shared per-session state. Mutated from the caller side (start/stop/cancel)
/// and from the event pump; the epoch lets a stale pump recognize that its
/// session is gone without being able to touch a successor.
struct SessionInner {
    state: SessionState,
    epoch: u64,
    should_continue: bool,
    simulated: bool,
    accumulated: String,
    last_partial: String,
    error_reported: bool,
    pending: Option<oneshot::Sender<Option<String>>>,
    engine_session: Option<Box<dyn EngineSession>>,
    on_partial: Option<PartialCallback>,
    on_error: Option<ErrorCallback>,
}

impl SessionInner {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            epoch: 0,
            should_continue: false,
            simulated: false,
            accumulated: String::new(),
            last_partial: String::new(),
            error_reported: false,
            pending: None,
            engine_session: None,
            on_partial: None,
            on_error: None,
        }
    }

    fn result_or_absent(&self) -> Option<String> {
        if self.accumulated.is_empty() {
            None
        } else {
            Some(self.accumulated.clone())
        }
    }
}

struct Shared {
    engine: Arc<dyn RecognitionEngine>,
    fallback: Arc<dyn RecognitionEngine>,
    gate: ModelGate,
    sample_rate: u32,
    inner: Mutex<SessionInner>,
}

/// Manages the lifecycle of one listening episode at a time.
///
/// Cheap to clone; clones share the same session slot.
#[derive(Clone)]
pub struct SpeechSession {
    shared: Arc<Shared>,
}

impl SpeechSession {
    /// Create a session manager over `engine`, guarded by `gate`.
    ///
    /// While the gate is unready, sessions run against the scripted
    /// [`SimulatedEngine`] instead of `engine`.
    pub fn new(engine: Arc<dyn RecognitionEngine>, gate: ModelGate, sample_rate: u32) -> Self {
        Self {
            shared: Arc::new(Shared {
                engine,
                fallback: Arc::new(SimulatedEngine::new()),
                gate,
                sample_rate,
                inner: Mutex::new(SessionInner::new()),
            }),
        }
    }

    /// Whether the recognition model has finished loading.
    pub fn is_model_ready(&self) -> bool {
        self.shared.gate.is_ready()
    }

    /// Whether a listening episode is currently active.
    pub fn is_listening(&self) -> bool {
        matches!(
            self.shared.lock_inner().state,
            SessionState::Listening | SessionState::Stopping
        )
    }

    /// Start listening and wait for the episode's final text.
    ///
    /// `on_partial` receives live hypotheses and, after each settled segment,
    /// the full accumulated text so far; `on_error` is invoked at most once
    /// per episode. Returns `None` immediately if an episode is already
    /// active (a no-op, not an error), and otherwise suspends until a
    /// terminal engine event or an explicit [`SpeechSession::stop_listening`].
    ///
    /// Dropping the returned future (caller cancellation) tears the engine
    /// session down exactly like an explicit stop.
    pub async fn start_listening<P, E>(&self, on_partial: P, on_error: E) -> Option<String>
    where
        P: Fn(&str) + Send + Sync + 'static,
        E: Fn(&str) + Send + Sync + 'static,
    {
        let simulated = !self.shared.gate.is_ready();
        let (result_rx, epoch) = {
            let mut inner = self.shared.lock_inner();
            if inner.state != SessionState::Idle || inner.pending.is_some() {
                debug!("speech session already active; start ignored");
                return None;
            }

            let (tx, rx) = oneshot::channel();
            inner.epoch += 1;
            inner.state = SessionState::Listening;
            inner.should_continue = true;
            inner.simulated = simulated;
            inner.accumulated.clear();
            inner.last_partial.clear();
            inner.error_reported = false;
            inner.pending = Some(tx);
            inner.on_partial = Some(Arc::new(on_partial));
            inner.on_error = Some(Arc::new(on_error));
            (rx, inner.epoch)
        };

        let engine = if simulated {
            info!("model not ready; using simulated recognition");
            &self.shared.fallback
        } else {
            &self.shared.engine
        };

        let (event_tx, event_rx) = event_channel();
        match engine.start_session(self.shared.sample_rate, event_tx) {
            Ok(handle) => self.shared.adopt_engine_session(epoch, handle),
            Err(e) => {
                warn!(engine = engine.name(), error = %e, "engine session start failed");
                self.shared.fail_start(epoch, &e.to_string());
            }
        }

        let pump_shared = Arc::clone(&self.shared);
        tokio::spawn(async move {
            Shared::pump(pump_shared, epoch, event_rx).await;
        });

        // If the caller abandons the wait, the guard stops the episode
        // before the cancellation propagates, leaving no orphaned engine session.
        let mut guard = StopOnDrop {
            shared: Arc::clone(&self.shared),
            epoch,
            armed: true,
        };
        let result = result_rx.await.unwrap_or(None);
        guard.armed = false;
        result
    }

    /// Stop the current episode, if any. Idempotent.
    ///
    /// Resolves the pending result with, in order of precedence: the
    /// accumulated final text, the last partial hypothesis, or (with neither
    /// recorded) `None` for a real session and the canned fallback phrase
    /// for a simulated one. A partial hypothesis is an acceptable substitute
    /// for a final result the user cut off mid-utterance.
    pub fn stop_listening(&self) {
        self.shared.stop(None);
    }
}

impl Shared {
    fn lock_inner(&self) -> MutexGuard<'_, SessionInner> {
        // Callbacks run outside the lock and session state is plain data, so
        // a poisoned mutex can only come from a panicking test double.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Store the engine handle for a freshly started episode. If the episode
    /// was stopped before the handle landed, shut it down instead.
    fn adopt_engine_session(&self, epoch: u64, mut handle: Box<dyn EngineSession>) {
        let mut inner = self.lock_inner();
        let current = inner.epoch == epoch
            && matches!(
                inner.state,
                SessionState::Listening | SessionState::Stopping
            );
        if current {
            inner.engine_session = Some(handle);
        } else {
            drop(inner);
            handle.stop();
        }
    }

    /// Engine session could not be opened: report once, deliver an absent
    /// result, return the slot to idle.
    fn fail_start(&self, epoch: u64, message: &str) {
        let callback = {
            let mut inner = self.lock_inner();
            if inner.epoch != epoch || inner.pending.is_none() {
                return;
            }
            inner.should_continue = false;
            inner.error_reported = true;
            let cb = inner.on_error.clone();
            Self::resolve(&mut inner, None);
            cb
        };
        if let Some(cb) = callback {
            cb(message);
        }
    }

    fn stop(&self, epoch: Option<u64>) {
        let mut inner = self.lock_inner();
        if let Some(e) = epoch {
            if inner.epoch != e {
                return;
            }
        }

        inner.should_continue = false;
        if inner.state == SessionState::Listening {
            inner.state = SessionState::Stopping;
            if let Some(session) = inner.engine_session.as_mut() {
                session.stop();
            }
        }

        if inner.pending.is_some() {
            let text = if !inner.accumulated.is_empty() {
                Some(inner.accumulated.clone())
            } else if !inner.last_partial.is_empty() {
                Some(inner.last_partial.clone())
            } else if inner.simulated {
                Some(SIMULATED_FALLBACK.to_string())
            } else {
                None
            };
            debug!(result = ?text, "stop resolving pending result");
            Self::resolve(&mut inner, text);
        }
    }

    /// Deliver the result exactly once and return the slot to idle.
    ///
    /// The one-shot sender is taken atomically with delivery; a later
    /// fulfillment attempt finds `pending` empty and does nothing.
    fn resolve(inner: &mut SessionInner, value: Option<String>) {
        if let Some(tx) = inner.pending.take() {
            inner.state = SessionState::Completed;
            // The receiver may already be gone (cancelled caller); delivery
            // is best-effort either way.
            let _ = tx.send(value);
        }
        if let Some(mut session) = inner.engine_session.take() {
            session.stop();
        }
        inner.on_partial = None;
        inner.on_error = None;
        // Result consumed: the slot is free for the next episode.
        inner.state = SessionState::Idle;
    }

    async fn pump(shared: Arc<Shared>, epoch: u64, mut events: EventReceiver) {
        while let Some(event) = events.recv().await {
            if !shared.handle_event(epoch, event) {
                break;
            }
        }
    }

    /// Fold one engine event into the session. Returns `false` once the
    /// episode this pump belongs to is over.
    fn handle_event(&self, epoch: u64, event: EngineEvent) -> bool {
        let mut notify_partial: Option<(PartialCallback, String)> = None;
        let mut notify_error: Option<(ErrorCallback, String)> = None;

        let keep_pumping = {
            let mut inner = self.lock_inner();
            if inner.epoch != epoch || inner.pending.is_none() {
                // Trailing event from an episode that already delivered.
                return false;
            }

            match event {
                EngineEvent::Partial(raw) => {
                    let text = payload::partial_text(&raw);
                    if !text.is_empty() {
                        // Scripted hypotheses are shown to the caller but not
                        // kept as a stop fallback; the canned phrase covers
                        // that case for simulated episodes.
                        if !inner.simulated {
                            inner.last_partial = text.clone();
                        }
                        if let Some(cb) = inner.on_partial.clone() {
                            notify_partial = Some((cb, text));
                        }
                    }
                }
                EngineEvent::Final(raw) => {
                    let text = payload::final_text(&raw);
                    if !text.is_empty() {
                        if !inner.accumulated.is_empty() {
                            inner.accumulated.push(' ');
                        }
                        inner.accumulated.push_str(&text);
                        inner.last_partial.clear();
                        debug!(accumulated = %inner.accumulated, "final segment folded in");
                        if let Some(cb) = inner.on_partial.clone() {
                            // The caller sees growing final text, not
                            // per-utterance deltas.
                            notify_partial = Some((cb, inner.accumulated.clone()));
                        }
                    }
                    if !(inner.should_continue && inner.state == SessionState::Listening) {
                        let value = inner.result_or_absent();
                        Self::resolve(&mut inner, value);
                    }
                }
                EngineEvent::Timeout => {
                    if inner.should_continue && inner.state == SessionState::Listening {
                        debug!("engine timeout while listening; continuing");
                    } else {
                        let value = inner.result_or_absent();
                        Self::resolve(&mut inner, value);
                    }
                }
                EngineEvent::Error(message) => {
                    warn!(error = %message, "engine reported an error");
                    inner.should_continue = false;
                    if !inner.error_reported {
                        inner.error_reported = true;
                        if let Some(cb) = inner.on_error.clone() {
                            notify_error = Some((cb, message));
                        }
                    }
                    let value = inner.result_or_absent();
                    Self::resolve(&mut inner, value);
                }
            }

            inner.pending.is_some()
        };

        if let Some((cb, text)) = notify_partial {
            cb(&text);
        }
        if let Some((cb, message)) = notify_error {
            cb(&message);
        }

        keep_pumping
    }
}

/// Cancellation guard: stops the episode when the waiting caller goes away.
struct StopOnDrop {
    shared: Arc<Shared>,
    epoch: u64,
    armed: bool,
}

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        if self.armed {
            debug!("caller abandoned the wait; stopping episode");
            self.shared.stop(Some(self.epoch));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::{SIMULATED_FALLBACK, SIMULATED_SCRIPT};
    use crate::engine::{EngineSession, EventSender};
    use crate::error::{Result, VocamError};
    use std::path::Path;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    /// Engine test double: hands its event sender to the test and records
    /// whether its session was stopped.
    struct ScriptedEngine {
        sender: Mutex<Option<EventSender>>,
        stopped: Arc<AtomicBool>,
        starts: AtomicUsize,
        fail_start: bool,
    }

    impl ScriptedEngine {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                sender: Mutex::new(None),
                stopped: Arc::new(AtomicBool::new(false)),
                starts: AtomicUsize::new(0),
                fail_start: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                sender: Mutex::new(None),
                stopped: Arc::new(AtomicBool::new(false)),
                starts: AtomicUsize::new(0),
                fail_start: true,
            })
        }

        async fn sender(&self) -> EventSender {
            for _ in 0..200 {
                if let Some(tx) = self.sender.lock().unwrap().clone() {
                    return tx;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            panic!("engine session never started");
        }

        fn was_stopped(&self) -> bool {
            self.stopped.load(Ordering::SeqCst)
        }
    }

    struct ScriptedSession {
        stopped: Arc<AtomicBool>,
    }

    impl EngineSession for ScriptedSession {
        fn stop(&mut self) {
            self.stopped.store(true, Ordering::SeqCst);
        }
    }

    impl RecognitionEngine for ScriptedEngine {
        fn load_model(&self, _path: &Path) -> Result<()> {
            Ok(())
        }

        fn start_session(
            &self,
            _sample_rate: u32,
            events: EventSender,
        ) -> Result<Box<dyn EngineSession>> {
            self.starts.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                return Err(VocamError::EngineStart {
                    message: "no microphone".to_string(),
                });
            }
            *self.sender.lock().unwrap() = Some(events);
            Ok(Box::new(ScriptedSession {
                stopped: Arc::clone(&self.stopped),
            }))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn ready_session(engine: Arc<ScriptedEngine>) -> SpeechSession {
        SpeechSession::new(engine, ModelGate::ready(), 16000)
    }

    /// Collects partial callback invocations for assertions.
    fn partial_collector() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) + Send + Sync) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |text: &str| {
            sink.lock().unwrap().push(text.to_string())
        })
    }

    #[tokio::test]
    async fn final_segments_accumulate_in_arrival_order() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));
        let (partials, on_partial) = partial_collector();

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(on_partial, |_| {}).await })
        };

        let tx = engine.sender().await;
        tx.send(EngineEvent::Final(payload::encode_final("hello")))
            .unwrap();
        tx.send(EngineEvent::Final(payload::encode_final("there")))
            .unwrap();
        tx.send(EngineEvent::Final(payload::encode_final("friend")))
            .unwrap();

        // Let the pump drain before stopping.
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.stop_listening();

        assert_eq!(waiter.await.unwrap(), Some("hello there friend".to_string()));
        // The caller saw growing accumulated text, not per-utterance deltas.
        assert_eq!(
            *partials.lock().unwrap(),
            vec!["hello", "hello there", "hello there friend"]
        );
    }

    #[tokio::test]
    async fn partials_are_forwarded_but_never_accumulated() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));
        let (partials, on_partial) = partial_collector();

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(on_partial, |_| {}).await })
        };

        let tx = engine.sender().await;
        tx.send(EngineEvent::Partial(payload::encode_partial("hel")))
            .unwrap();
        tx.send(EngineEvent::Partial(payload::encode_partial("hello")))
            .unwrap();
        tx.send(EngineEvent::Final(payload::encode_final("hello there")))
            .unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        session.stop_listening();

        assert_eq!(waiter.await.unwrap(), Some("hello there".to_string()));
        assert_eq!(
            *partials.lock().unwrap(),
            vec!["hel", "hello", "hello there"]
        );
    }

    #[tokio::test]
    async fn stop_before_any_event_is_absent_in_real_mode() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
        };

        engine.sender().await;
        session.stop_listening();

        assert_eq!(waiter.await.unwrap(), None);
        assert!(engine.was_stopped());
    }

    #[tokio::test]
    async fn stop_after_partial_only_returns_that_partial() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
        };

        let tx = engine.sender().await;
        tx.send(EngineEvent::Partial(payload::encode_partial("hi")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.stop_listening();

        assert_eq!(waiter.await.unwrap(), Some("hi".to_string()));
    }

    #[tokio::test]
    async fn accumulated_text_outranks_last_partial_on_stop() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
        };

        let tx = engine.sender().await;
        tx.send(EngineEvent::Final(payload::encode_final("turn left")))
            .unwrap();
        tx.send(EngineEvent::Partial(payload::encode_partial("then")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.stop_listening();

        assert_eq!(waiter.await.unwrap(), Some("turn left".to_string()));
    }

    #[tokio::test]
    async fn timeout_while_listening_is_ignored() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
        };

        let tx = engine.sender().await;
        tx.send(EngineEvent::Timeout).unwrap();
        tx.send(EngineEvent::Partial(payload::encode_partial("still here")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.stop_listening();

        assert_eq!(waiter.await.unwrap(), Some("still here".to_string()));
    }

    #[tokio::test]
    async fn engine_error_reports_once_and_returns_accumulated_text() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));
        let errors = Arc::new(AtomicUsize::new(0));
        let errors_cb = Arc::clone(&errors);

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move {
                session
                    .start_listening(|_| {}, move |_| {
                        errors_cb.fetch_add(1, Ordering::SeqCst);
                    })
                    .await
            })
        };

        let tx = engine.sender().await;
        tx.send(EngineEvent::Final(payload::encode_final("go north")))
            .unwrap();
        tx.send(EngineEvent::Error("decoder died".to_string()))
            .unwrap();
        // A spurious second error must not reach the caller.
        tx.send(EngineEvent::Error("decoder died again".to_string()))
            .unwrap();

        assert_eq!(waiter.await.unwrap(), Some("go north".to_string()));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn engine_error_with_no_text_is_absent() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
        };

        let tx = engine.sender().await;
        tx.send(EngineEvent::Error("boom".to_string())).unwrap();

        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn engine_start_failure_reports_error_and_returns_absent() {
        let engine = ScriptedEngine::failing();
        let session = ready_session(Arc::clone(&engine));
        let errors = Arc::new(AtomicUsize::new(0));
        let errors_cb = Arc::clone(&errors);

        let result = session
            .start_listening(|_| {}, move |_| {
                errors_cb.fetch_add(1, Ordering::SeqCst);
            })
            .await;

        assert_eq!(result, None);
        assert_eq!(errors.load(Ordering::SeqCst), 1);
        assert!(!session.is_listening());
    }

    #[tokio::test]
    async fn double_start_is_rejected_without_touching_the_active_session() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
        };

        let tx = engine.sender().await;
        // Second start while the first is listening: rejected immediately.
        assert_eq!(session.start_listening(|_| {}, |_| {}).await, None);
        assert_eq!(engine.starts.load(Ordering::SeqCst), 1);

        // The first session is unaffected and finishes normally.
        tx.send(EngineEvent::Final(payload::encode_final("unaffected")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.stop_listening();
        assert_eq!(waiter.await.unwrap(), Some("unaffected".to_string()));
    }

    #[tokio::test]
    async fn session_is_reusable_without_leaking_text() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));

        for expected in ["first run", "second run"] {
            let waiter = {
                let session = session.clone();
                tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
            };
            let tx = engine.sender().await;
            tx.send(EngineEvent::Final(payload::encode_final(expected)))
                .unwrap();
            tokio::time::sleep(Duration::from_millis(50)).await;
            session.stop_listening();
            assert_eq!(waiter.await.unwrap(), Some(expected.to_string()));

            // Reset the double for the next round.
            *engine.sender.lock().unwrap() = None;
        }
    }

    #[tokio::test]
    async fn malformed_payloads_are_skipped_without_failing_the_session() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));
        let (partials, on_partial) = partial_collector();

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(on_partial, |_| {}).await })
        };

        let tx = engine.sender().await;
        tx.send(EngineEvent::Partial("{{{ not json".to_string()))
            .unwrap();
        tx.send(EngineEvent::Final("also not json".to_string()))
            .unwrap();
        tx.send(EngineEvent::Final(payload::encode_final("recovered")))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.stop_listening();

        assert_eq!(waiter.await.unwrap(), Some("recovered".to_string()));
        assert_eq!(*partials.lock().unwrap(), vec!["recovered"]);
    }

    #[tokio::test]
    async fn cancelling_the_waiter_stops_the_engine_session() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
        };

        engine.sender().await;
        assert!(session.is_listening());
        waiter.abort();
        let _ = waiter.await;

        assert!(engine.was_stopped());
        assert!(!session.is_listening());

        // The slot is free again.
        *engine.sender.lock().unwrap() = None;
        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
        };
        engine.sender().await;
        session.stop_listening();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let engine = ScriptedEngine::new();
        let session = ready_session(Arc::clone(&engine));

        // Stopping with nothing active is a no-op.
        session.stop_listening();

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
        };
        engine.sender().await;
        session.stop_listening();
        session.stop_listening();
        assert_eq!(waiter.await.unwrap(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_mode_scripts_partials_and_stops_to_the_fallback_phrase() {
        let engine = ScriptedEngine::new();
        let session = SpeechSession::new(engine.clone(), ModelGate::unready(), 16000);
        assert!(!session.is_model_ready());
        let (partials, on_partial) = partial_collector();

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(on_partial, |_| {}).await })
        };

        // The real engine is never consulted while the gate is unready.
        tokio::time::sleep(Duration::from_millis(2600)).await;
        assert_eq!(engine.starts.load(Ordering::SeqCst), 0);
        assert_eq!(partials.lock().unwrap().as_slice(), SIMULATED_SCRIPT);

        session.stop_listening();
        assert_eq!(waiter.await.unwrap(), Some(SIMULATED_FALLBACK.to_string()));
    }

    #[tokio::test(start_paused = true)]
    async fn simulated_stop_before_any_partial_still_returns_the_fallback_phrase() {
        let engine = ScriptedEngine::new();
        let session = SpeechSession::new(engine, ModelGate::unready(), 16000);

        let waiter = {
            let session = session.clone();
            tokio::spawn(async move { session.start_listening(|_| {}, |_| {}).await })
        };

        // Stop before the first scripted partial fires.
        tokio::time::sleep(Duration::from_millis(100)).await;
        session.stop_listening();
        assert_eq!(waiter.await.unwrap(), Some(SIMULATED_FALLBACK.to_string()));
    }
}
