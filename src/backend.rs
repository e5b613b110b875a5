//! Assistant backend client.
//!
//! Sends the recognized request text together with the captured JPEG as one
//! multipart POST and returns the backend's spoken-response text. No retry
//! policy: a failed request surfaces as an error and the interaction resets.

use crate::defaults::BACKEND_ENDPOINT;
use crate::error::{Result, VocamError};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Response envelope returned by the backend.
#[derive(Debug, Deserialize)]
struct NavigateResponse {
    output: Option<String>,
}

/// HTTP client for the text+image assistant backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    /// Create a client for `base_url` with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Submit a spoken request and its photo; returns the response text with
    /// newlines flattened to spaces, ready for playback.
    pub async fn ask(&self, text: &str, image_path: &Path) -> Result<String> {
        let image_bytes = tokio::fs::read(image_path).await?;
        let file_name = image_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "capture.jpg".to_string());

        debug!(
            text,
            image = %image_path.display(),
            image_bytes = image_bytes.len(),
            "sending request to backend"
        );

        let image_part = reqwest::multipart::Part::bytes(image_bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")?;
        let form = reqwest::multipart::Form::new()
            .text("text", text.to_string())
            .part("image", image_part);

        let url = format!("{}{}", self.base_url, BACKEND_ENDPOINT);
        let response = self.client.post(&url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(VocamError::BackendStatus {
                status: status.as_u16(),
                body,
            });
        }

        let envelope: NavigateResponse = response.json().await?;
        let output = envelope
            .output
            .ok_or_else(|| VocamError::BackendResponse {
                message: "no 'output' field in response".to_string(),
            })?;

        let cleaned = flatten_newlines(&output);
        info!(chars = cleaned.len(), "backend response received");
        Ok(cleaned)
    }
}

/// Replace newlines with spaces so the TTS reads the response as prose.
fn flatten_newlines(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}
