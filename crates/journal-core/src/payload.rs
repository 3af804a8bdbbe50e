//! Entry payloads
//!
//! Early journal schemas stored a single plain-text message per entry. Later
//! schemas store a structured key/value record so workers can attach
//! arbitrary named fields. Both shapes are variants of [`Payload`], and both
//! support the same truncation of their human-readable portion.

use std::borrow::Cow;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::PayloadError;

/// Name of the human-readable sub-field in a structured payload
pub const MESSAGE_FIELD: &str = "message";

/// Appended to a value that was cut short
pub const TRUNCATION_MARKER: &str = "...";

/// How a payload is encoded in storage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadFormat {
    /// Plain text, stored verbatim
    Text,
    /// JSON object
    Structured,
}

impl PayloadFormat {
    /// Storage code for this format
    pub fn code(self) -> i64 {
        match self {
            PayloadFormat::Text => 0,
            PayloadFormat::Structured => 1,
        }
    }

    pub fn from_code(code: i64) -> Result<Self, PayloadError> {
        match code {
            0 => Ok(PayloadFormat::Text),
            1 => Ok(PayloadFormat::Structured),
            other => Err(PayloadError::UnknownFormat(other)),
        }
    }
}

/// The body of a journal entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Payload {
    /// Legacy single plain-text message
    Text(String),
    /// Structured record with arbitrary named fields
    Structured(Map<String, Value>),
}

impl Payload {
    /// Create a plain-text payload
    pub fn text(message: impl Into<String>) -> Self {
        Payload::Text(message.into())
    }

    /// Create a structured payload holding only a `message` field
    pub fn message(message: impl Into<String>) -> Self {
        let mut fields = Map::new();
        fields.insert(MESSAGE_FIELD.to_string(), Value::String(message.into()));
        Payload::Structured(fields)
    }

    /// Create a structured payload from a JSON value
    ///
    /// The value must be a JSON object.
    pub fn from_value(value: Value) -> Result<Self, PayloadError> {
        match value {
            Value::Object(fields) => Ok(Payload::Structured(fields)),
            Value::Null => Err(PayloadError::NotAnObject("null")),
            Value::Bool(_) => Err(PayloadError::NotAnObject("bool")),
            Value::Number(_) => Err(PayloadError::NotAnObject("number")),
            Value::String(_) => Err(PayloadError::NotAnObject("string")),
            Value::Array(_) => Err(PayloadError::NotAnObject("array")),
        }
    }

    pub fn format(&self) -> PayloadFormat {
        match self {
            Payload::Text(_) => PayloadFormat::Text,
            Payload::Structured(_) => PayloadFormat::Structured,
        }
    }

    /// Encode into the stored text form
    pub fn encode(&self) -> Result<String, PayloadError> {
        match self {
            Payload::Text(text) => Ok(text.clone()),
            Payload::Structured(fields) => {
                serde_json::to_string(fields).map_err(|e| PayloadError::Encode(e.to_string()))
            }
        }
    }

    /// Decode from the stored text form
    pub fn decode(format: PayloadFormat, stored: &str) -> Result<Self, PayloadError> {
        match format {
            PayloadFormat::Text => Ok(Payload::Text(stored.to_string())),
            PayloadFormat::Structured => {
                let value: Value = serde_json::from_str(stored)
                    .map_err(|e| PayloadError::Decode(e.to_string()))?;
                Self::from_value(value)
            }
        }
    }

    /// The human-readable portion of the payload, if any
    pub fn message_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Structured(fields) => fields.get(MESSAGE_FIELD).and_then(Value::as_str),
        }
    }

    /// Return a copy with the human-readable portion truncated to `bound`
    ///
    /// A bound of 0 disables truncation. Only the `message` sub-field of a
    /// structured payload is touched; every other field is carried over as is.
    pub fn truncated(&self, bound: usize) -> Payload {
        match self {
            Payload::Text(text) => Payload::Text(truncate_text(text, bound).into_owned()),
            Payload::Structured(fields) => {
                let mut fields = fields.clone();
                if let Some(Value::String(message)) = fields.get_mut(MESSAGE_FIELD) {
                    *message = truncate_text(message, bound).into_owned();
                }
                Payload::Structured(fields)
            }
        }
    }
}

/// Truncate `text` to `bound` characters and append [`TRUNCATION_MARKER`]
///
/// Text shorter than the bound is returned unchanged. Text whose length is
/// equal to or above the bound keeps exactly `bound` characters followed by
/// the marker. Length is counted in characters, so multi-byte text is never
/// split mid-character.
pub fn truncate_text(text: &str, bound: usize) -> Cow<'_, str> {
    if bound == 0 {
        return Cow::Borrowed(text);
    }
    match text.char_indices().nth(bound) {
        Some((cut, _)) => Cow::Owned(format!("{}{}", &text[..cut], TRUNCATION_MARKER)),
        None if text.chars().count() == bound => {
            Cow::Owned(format!("{}{}", text, TRUNCATION_MARKER))
        }
        None => Cow::Borrowed(text),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_truncate_short_text_unchanged() {
        assert_eq!(truncate_text("hi", 5), "hi");
        assert!(matches!(truncate_text("hi", 5), Cow::Borrowed(_)));
    }

    #[test]
    fn test_truncate_at_bound_appends_marker() {
        assert_eq!(truncate_text("hello", 5), "hello...");
    }

    #[test]
    fn test_truncate_above_bound() {
        assert_eq!(truncate_text("hello world", 5), "hello...");
    }

    #[test]
    fn test_truncate_zero_bound_disabled() {
        assert_eq!(truncate_text("hello world", 0), "hello world");
    }

    #[test]
    fn test_truncate_multibyte() {
        assert_eq!(truncate_text("héllo wörld", 7), "héllo w...");
        assert_eq!(truncate_text("日本語テキスト", 3), "日本語...");
    }

    #[test]
    fn test_structured_truncation_keeps_siblings() {
        let payload = Payload::from_value(json!({"message": "hello world", "code": 7})).unwrap();
        let truncated = payload.truncated(5);
        let Payload::Structured(fields) = truncated else {
            panic!("expected structured payload");
        };
        assert_eq!(fields["message"], json!("hello..."));
        assert_eq!(fields["code"], json!(7));
    }

    #[test]
    fn test_structured_without_message_untouched() {
        let payload = Payload::from_value(json!({"status": "a very long status line"})).unwrap();
        assert_eq!(payload.truncated(3), payload);
    }

    #[test]
    fn test_non_string_message_untouched() {
        let payload = Payload::from_value(json!({"message": 123456789})).unwrap();
        assert_eq!(payload.truncated(3), payload);
    }

    #[test]
    fn test_encode_preserves_key_order() {
        let payload = Payload::from_value(json!({"zeta": 1, "message": "m", "alpha": 2})).unwrap();
        let encoded = payload.encode().unwrap();
        assert_eq!(encoded, r#"{"zeta":1,"message":"m","alpha":2}"#);
    }

    #[test]
    fn test_decode_structured() {
        let payload = Payload::decode(PayloadFormat::Structured, r#"{"message":"x"}"#).unwrap();
        assert_eq!(payload.message_text(), Some("x"));
        assert_eq!(payload.format(), PayloadFormat::Structured);
    }

    #[test]
    fn test_decode_text_is_verbatim() {
        let payload = Payload::decode(PayloadFormat::Text, r#"{"message":"x"}"#).unwrap();
        assert_eq!(payload, Payload::Text(r#"{"message":"x"}"#.into()));
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = Payload::decode(PayloadFormat::Structured, "[1,2]").unwrap_err();
        assert!(matches!(err, PayloadError::NotAnObject("array")));
    }

    #[test]
    fn test_format_codes() {
        for format in [PayloadFormat::Text, PayloadFormat::Structured] {
            assert_eq!(PayloadFormat::from_code(format.code()).unwrap(), format);
        }
        assert!(PayloadFormat::from_code(9).is_err());
    }
}
