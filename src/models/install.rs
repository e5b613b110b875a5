//! Model asset installation.
//!
//! Bundled model assets are a directory tree shipped next to the binary;
//! engines need them on a writable path. Installation copies the tree
//! verbatim on first use and is a no-op when the target already exists.

use crate::error::{Result, VocamError};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Get the directory where installed models live.
///
/// Uses `~/.local/share/vocam/models/` on Linux/Unix.
pub fn models_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from(".local/share"))
        .join("vocam")
        .join("models")
}

/// Get the installed path for a model directory.
///
/// Always returns a path regardless of whether the model is installed.
pub fn model_path(name: &str) -> PathBuf {
    models_dir().join(name)
}

/// Check if a model is installed.
pub fn is_model_installed(name: &str) -> bool {
    model_path(name).exists()
}

/// Install a model by copying its asset tree to `target`.
///
/// No-op if `target` already exists: an installed model is never touched
/// again, matching the first-use-only copy contract.
///
/// # Errors
///
/// Returns [`VocamError::ModelAssetsNotFound`] when `source` does not exist
/// and [`VocamError::ModelInstall`] when any copy step fails.
pub fn install_model(source: &Path, target: &Path) -> Result<()> {
    if target.exists() {
        debug!(target = %target.display(), "model already installed");
        return Ok(());
    }

    if !source.exists() {
        return Err(VocamError::ModelAssetsNotFound {
            path: source.display().to_string(),
        });
    }

    copy_tree(source, target)?;
    info!(
        source = %source.display(),
        target = %target.display(),
        "model assets installed"
    );
    Ok(())
}

/// Recursively copy a directory tree.
///
/// Whether an entry is a directory is decided by attempting to enumerate its
/// children; anything that cannot be enumerated is copied as a file.
fn copy_tree(source: &Path, target: &Path) -> Result<()> {
    fs::create_dir_all(target).map_err(|e| VocamError::ModelInstall {
        message: format!("creating {}: {e}", target.display()),
    })?;

    let entries = fs::read_dir(source).map_err(|e| VocamError::ModelInstall {
        message: format!("listing {}: {e}", source.display()),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| VocamError::ModelInstall {
            message: format!("reading entry in {}: {e}", source.display()),
        })?;
        let from = entry.path();
        let to = target.join(entry.file_name());

        match fs::read_dir(&from) {
            Ok(_) => copy_tree(&from, &to)?,
            Err(_) => {
                fs::copy(&from, &to).map_err(|e| VocamError::ModelInstall {
                    message: format!("copying {}: {e}", from.display()),
                })?;
            }
        }
    }

    Ok(())
}
