//! Structured-response extraction.
//!
//! Executors return raw text. Some capabilities wrap their payload in a
//! structured envelope carrying a content type and a nested content field;
//! when the envelope says `application/json`, the payload is extracted so
//! the optimizer can work on the actual JSON. Extraction never fails
//! upward: anything that doesn't match the envelope falls back to the raw
//! text, logged at debug level only.

use serde_json::Value;
use tracing::debug;

const JSON_CONTENT_TYPE: &str = "application/json";

/// Attempt to pull a JSON payload out of a structured executor response.
///
/// Requirements: the raw text parses as a JSON object with a `contentType`
/// field beginning with `application/json` (case-insensitive) and a
/// non-empty `content` field. String payloads are returned as-is;
/// structured payloads are re-serialized. Returns `None` when the raw text
/// should be used unmodified.
pub fn extract_json_payload(raw: &str) -> Option<String> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Executor result is not JSON, using raw text");
            return None;
        }
    };

    let object = match value.as_object() {
        Some(o) => o,
        None => {
            debug!("Executor result is JSON but not an object, using raw text");
            return None;
        }
    };

    let content_type = object.get("contentType").and_then(Value::as_str);
    let is_json = content_type
        .and_then(|ct| ct.get(..JSON_CONTENT_TYPE.len()))
        .map(|prefix| prefix.eq_ignore_ascii_case(JSON_CONTENT_TYPE))
        .unwrap_or(false);
    if !is_json {
        debug!(content_type, "No JSON content type on executor result, using raw text");
        return None;
    }

    match object.get("content") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Null) | None => {
            debug!("Structured response has no content payload, using raw text");
            None
        }
        Some(content) => {
            // Structured payload: re-serialize compactly
            match serde_json::to_string(content) {
                Ok(json) => Some(json),
                Err(e) => {
                    debug!(error = %e, "Failed to re-serialize content payload, using raw text");
                    None
                }
            }
        }
    }
}
