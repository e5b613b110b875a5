//! Image capture.
//!
//! Every assistant request carries a photo taken at the moment listening
//! starts. Capture is abstracted behind [`ImageCapture`] so the interaction
//! loop can run against a webcam command in production and a fixed file in
//! tests and development.

use crate::config::CameraConfig;
use crate::error::{Result, VocamError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Source of photos for assistant requests.
#[async_trait]
pub trait ImageCapture: Send + Sync {
    /// Take a photo and write it as a JPEG to `output`.
    async fn capture(&self, output: &Path) -> Result<()>;
}

/// Captures through an external command (fswebcam by default).
///
/// The configured arguments are passed first; the output path is appended
/// as the last argument.
pub struct CommandCamera {
    command: String,
    args: Vec<String>,
}

impl CommandCamera {
    pub fn new(config: &CameraConfig) -> Self {
        Self {
            command: config.capture_command.clone(),
            args: config.capture_args.clone(),
        }
    }

    /// Full argument list for one capture, output path last.
    fn capture_args(&self, output: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(output.display().to_string());
        args
    }
}

#[async_trait]
impl ImageCapture for CommandCamera {
    async fn capture(&self, output: &Path) -> Result<()> {
        let args = self.capture_args(output);
        debug!(command = %self.command, ?args, "capturing image");

        let result = tokio::process::Command::new(&self.command)
            .args(&args)
            .output()
            .await
            .map_err(|e| VocamError::Capture {
                message: format!("Failed to execute {}: {}", self.command, e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(VocamError::Capture {
                message: format!(
                    "{} failed with status {:?}: {}",
                    self.command, result.status, stderr
                ),
            });
        }

        if !output.exists() {
            return Err(VocamError::Capture {
                message: format!(
                    "{} reported success but produced no file at {}",
                    self.command,
                    output.display()
                ),
            });
        }

        info!(output = %output.display(), "image captured");
        Ok(())
    }
}

/// Serves a fixed image file instead of a live camera.
///
/// Useful for development machines without a webcam and for tests.
pub struct FileCamera {
    source: PathBuf,
}

impl FileCamera {
    pub fn new(source: impl Into<PathBuf>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

#[async_trait]
impl ImageCapture for FileCamera {
    async fn capture(&self, output: &Path) -> Result<()> {
        if !self.source.exists() {
            return Err(VocamError::Capture {
                message: format!("source image not found: {}", self.source.display()),
            });
        }
        tokio::fs::copy(&self.source, output).await?;
        debug!(source = %self.source.display(), output = %output.display(), "copied fixed image");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_camera_appends_output_path_last() {
        let camera = CommandCamera::new(&CameraConfig::default());
        let args = camera.capture_args(Path::new("/tmp/shot.jpg"));
        assert_eq!(args, vec!["--no-banner", "/tmp/shot.jpg"]);
    }

    #[test]
    fn command_camera_uses_configured_command() {
        let config = CameraConfig {
            capture_command: "libcamera-still".to_string(),
            capture_args: vec!["-o".to_string()],
        };
        let camera = CommandCamera::new(&config);
        assert_eq!(camera.command, "libcamera-still");
        assert_eq!(
            camera.capture_args(Path::new("out.jpg")),
            vec!["-o", "out.jpg"]
        );
    }

    #[tokio::test]
    async fn file_camera_copies_the_source_image() {
        let tmp = tempfile::tempdir().unwrap();
        let source = tmp.path().join("fixture.jpg");
        let output = tmp.path().join("capture.jpg");
        std::fs::write(&source, b"jpeg bytes").unwrap();

        let camera = FileCamera::new(&source);
        camera.capture(&output).await.unwrap();

        assert_eq!(std::fs::read(&output).unwrap(), b"jpeg bytes");
    }

    #[tokio::test]
    async fn file_camera_reports_missing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let camera = FileCamera::new(tmp.path().join("absent.jpg"));
        let result = camera.capture(&tmp.path().join("out.jpg")).await;
        assert!(matches!(result, Err(VocamError::Capture { .. })));
    }

    #[test]
    fn image_capture_is_object_safe() {
        let _camera: Box<dyn ImageCapture> = Box::new(FileCamera::new("fixture.jpg"));
    }
}
