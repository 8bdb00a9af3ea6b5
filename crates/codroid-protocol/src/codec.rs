//! Envelope encoding and reply decoding.
//!
//! Requests go out as a single compact JSON object and replies come back as
//! whatever bytes one socket read produced:
//!
//! ```text
//! {"id":<int>,"ty":"<route>","db":<payload>}
//! ```

use serde_json::{Map, Value};
use tracing::warn;

use crate::error::{ProtocolError, ProtocolResult};
use crate::types::Envelope;

/// Encodes an envelope to the bytes written for one request.
///
/// The output has no trailing delimiter and no length prefix.
///
/// # Example
///
/// ```rust
/// use codroid_protocol::{encode_envelope, Envelope};
/// use serde_json::json;
///
/// let envelope = Envelope::new(1, "project/pause", json!({}));
/// let bytes = encode_envelope(&envelope).unwrap();
/// assert_eq!(bytes, br#"{"id":1,"ty":"project/pause","db":{}}"#);
/// ```
pub fn encode_envelope(envelope: &Envelope) -> ProtocolResult<Vec<u8>> {
    Ok(serde_json::to_vec(envelope)?)
}

/// Builds an [`Envelope`] from its parts and encodes it.
pub fn encode_request(
    id: i64,
    route: impl Into<String>,
    payload: Value,
) -> ProtocolResult<Vec<u8>> {
    encode_envelope(&Envelope::new(id, route, payload))
}

/// Decodes the bytes of one read into reply text.
///
/// Invalid UTF-8 (typically a multi-byte character cut at the read buffer
/// boundary) is replaced with U+FFFD rather than rejected.
pub fn decode_reply(data: &[u8]) -> String {
    match std::str::from_utf8(data) {
        Ok(text) => text.to_string(),
        Err(e) => {
            warn!(
                bytes = data.len(),
                valid_up_to = e.valid_up_to(),
                "reply is not valid UTF-8, replacing invalid sequences"
            );
            String::from_utf8_lossy(data).into_owned()
        }
    }
}

/// Parses reply text into a JSON object.
///
/// Empty or whitespace-only text, malformed JSON, and JSON that is valid but
/// not an object are all rejected with [`ProtocolError::InvalidReply`].
pub fn parse_reply_object(text: &str) -> ProtocolResult<Map<String, Value>> {
    if text.trim().is_empty() {
        return Err(ProtocolError::invalid_reply("reply is empty"));
    }

    let value: Value = serde_json::from_str(text)
        .map_err(|e| ProtocolError::invalid_reply(format!("malformed JSON: {}", e)))?;

    match value {
        Value::Object(map) => Ok(map),
        other => Err(ProtocolError::invalid_reply(format!(
            "expected a JSON object, got {}",
            json_kind(&other)
        ))),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
