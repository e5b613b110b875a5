//! Recognition model management.
//!
//! Models ship as bundled asset directories and are copied into a writable
//! model directory on first use ([`install`]). [`ModelGate`] tracks whether
//! the engine has a model open: it is set once, asynchronously, after
//! construction, and read by every session start to decide between the real
//! engine and the simulated fallback.

pub mod install;

pub use install::{install_model, is_model_installed, model_path, models_dir};

use crate::engine::RecognitionEngine;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Process-scoped model readiness state with init-once semantics.
///
/// The flag flips to `true` at most once, when asset installation and the
/// engine's model open both succeed. Any failure leaves it `false` for the
/// rest of the process lifetime; the session manager then keeps serving the
/// simulated strategy instead of failing hard.
#[derive(Debug, Clone, Default)]
pub struct ModelGate {
    ready: Arc<AtomicBool>,
}

impl ModelGate {
    /// A gate that never becomes ready. Useful for forcing simulated mode.
    pub fn unready() -> Self {
        Self::default()
    }

    /// A gate that is ready from the start, for engines with a preloaded model.
    pub fn ready() -> Self {
        let gate = Self::default();
        gate.ready.store(true, Ordering::SeqCst);
        gate
    }

    /// Kick off the background load: install bundled assets into the default
    /// model directory, open the model through the engine, then flip the
    /// readiness flag.
    ///
    /// Returns immediately; readiness is observed through [`ModelGate::is_ready`].
    pub fn spawn_load(
        engine: Arc<dyn RecognitionEngine>,
        asset_dir: PathBuf,
        model_name: String,
    ) -> Self {
        Self::spawn_load_into(engine, asset_dir, model_name, models_dir())
    }

    /// Same as [`ModelGate::spawn_load`], with an explicit model directory.
    pub fn spawn_load_into(
        engine: Arc<dyn RecognitionEngine>,
        asset_dir: PathBuf,
        model_name: String,
        models_dir: PathBuf,
    ) -> Self {
        let gate = Self::default();
        let ready = Arc::clone(&gate.ready);

        tokio::spawn(async move {
            let source = asset_dir.join(&model_name);
            let target = models_dir.join(&model_name);
            let install_target = target.clone();

            let installed =
                tokio::task::spawn_blocking(move || install_model(&source, &install_target)).await;

            match installed {
                Ok(Ok(())) => match engine.load_model(&target) {
                    Ok(()) => {
                        ready.store(true, Ordering::SeqCst);
                        info!(model = %model_name, "recognition model ready");
                    }
                    Err(e) => {
                        warn!(model = %model_name, error = %e, "model open failed; staying in simulated mode");
                    }
                },
                Ok(Err(e)) => {
                    warn!(model = %model_name, error = %e, "model install failed; staying in simulated mode");
                }
                Err(e) => {
                    warn!(model = %model_name, error = %e, "model install task failed; staying in simulated mode");
                }
            }
        });

        gate
    }

    /// Pure read of the readiness flag.
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }
}
