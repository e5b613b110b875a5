//! Engine event payload parsing.
//!
//! Vosk-style engines report hypotheses as small JSON records:
//! `{"partial": "..."}` for in-progress text and `{"text": "..."}` for
//! settled segments. A malformed or unexpected payload is never fatal: it
//! parses to empty text (which the session ignores) and leaves a log line.

use serde_json::Value;
use tracing::warn;

/// Extract the in-progress hypothesis from a partial-result payload.
///
/// Returns an empty string when the payload is malformed or carries no
/// `partial` field.
pub fn partial_text(payload: &str) -> String {
    field_text(payload, "partial")
}

/// Extract the settled segment from a final-result payload.
///
/// Returns an empty string when the payload is malformed or carries no
/// `text` field.
pub fn final_text(payload: &str) -> String {
    field_text(payload, "text")
}

fn field_text(payload: &str, field: &str) -> String {
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => value
            .get(field)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        Err(e) => {
            warn!(error = %e, "discarding malformed engine payload");
            String::new()
        }
    }
}

/// Build a partial-result payload. Used by the simulated engine so scripted
/// events travel the same parse path as real ones.
pub fn encode_partial(text: &str) -> String {
    serde_json::json!({ "partial": text }).to_string()
}

/// Build a final-result payload.
pub fn encode_final(text: &str) -> String {
    serde_json::json!({ "text": text }).to_string()
}
