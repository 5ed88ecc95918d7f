//! Produce-request validation.
//!
//! [`RequestValidator`] turns an HTTP request into a [`CanonicalMessage`] or
//! the first [`ValidationError`] it hits. Checks run in a fixed order and the
//! first failure wins:
//!
//! | # | Check | Error |
//! |---|-------|-------|
//! | 1 | `Content-Type` is `application/json` | [`MissingContentType`], [`WrongContentType`] |
//! | 2 | declared `Content-Length` within the limit | [`BodyTooLarge`] |
//! | 3 | streamed body within the limit | [`BodyTooLarge`] |
//! | 4 | body is one JSON object with known fields of the right type | [`EmptyBody`], [`MalformedJson`], [`InvalidFieldType`], [`UnknownField`], [`TrailingData`] |
//! | 5 | `topic` present and allowed | [`MissingTopic`], [`UnknownTopic`] |
//! | 6 | exactly one of `value` / `value_str` | [`MissingValue`], [`ConflictingValue`] |
//!
//! The envelope accepts four keys, matched case-sensitively:
//!
//! ```json
//! { "topic": "orders", "key": "user-42", "value": {"id": 1} }
//! { "topic": "orders", "value_str": "raw text payload" }
//! ```
//!
//! A string `value` is forwarded as its raw UTF-8 bytes; any other JSON
//! `value` is re-serialized compactly with object keys sorted. Floats keep
//! their fractional part, so `1.0` is forwarded as `1.0`, not `1`.
//!
//! [`MissingContentType`]: ValidationError::MissingContentType
//! [`WrongContentType`]: ValidationError::WrongContentType
//! [`BodyTooLarge`]: ValidationError::BodyTooLarge
//! [`EmptyBody`]: ValidationError::EmptyBody
//! [`MalformedJson`]: ValidationError::MalformedJson
//! [`InvalidFieldType`]: ValidationError::InvalidFieldType
//! [`UnknownField`]: ValidationError::UnknownField
//! [`TrailingData`]: ValidationError::TrailingData
//! [`MissingTopic`]: ValidationError::MissingTopic
//! [`UnknownTopic`]: ValidationError::UnknownTopic
//! [`MissingValue`]: ValidationError::MissingValue
//! [`ConflictingValue`]: ValidationError::ConflictingValue

use crate::error::ValidationError;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, header};
use beget_kernel::{CanonicalMessage, TopicRegistry};
use bytes::Bytes;
use http_body_util::LengthLimitError;
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use serde_json::Value;
use serde_json::error::Category;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::sync::Arc;

/// Largest accepted request body: 1 MiB.
pub const MAX_BODY_BYTES: usize = 1_048_576;

const JSON_MEDIA_TYPE: &str = "application/json";

const FIELDS: &[&str] = &["topic", "key", "value", "value_str"];

/// Stateless request validator bound to a topic allowlist.
#[derive(Debug, Clone)]
pub struct RequestValidator {
    topics: Arc<TopicRegistry>,
    max_body_bytes: usize,
}

impl RequestValidator {
    pub fn new(topics: Arc<TopicRegistry>) -> Self {
        Self {
            topics,
            max_body_bytes: MAX_BODY_BYTES,
        }
    }

    /// Override the body limit. The rejection text still reads "1MB".
    pub fn with_max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    pub fn topics(&self) -> &TopicRegistry {
        &self.topics
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Run every check against one request.
    pub async fn validate(
        &self,
        headers: &HeaderMap,
        body: Body,
    ) -> Result<CanonicalMessage, ValidationError> {
        self.check_content_type(headers.get(header::CONTENT_TYPE))?;
        self.check_content_length(declared_length(headers))?;
        let raw = self.read_body(body).await?;
        self.decode(&raw)
    }

    /// The media type, ignoring parameters such as `charset`, must be
    /// `application/json`.
    pub fn check_content_type(&self, value: Option<&HeaderValue>) -> Result<(), ValidationError> {
        let value = match value {
            Some(v) if !v.is_empty() => v,
            _ => return Err(ValidationError::MissingContentType),
        };
        let media_type = value
            .to_str()
            .map_err(|_| ValidationError::WrongContentType)?
            .split(';')
            .next()
            .unwrap_or_default()
            .trim();

        if media_type.eq_ignore_ascii_case(JSON_MEDIA_TYPE) {
            Ok(())
        } else {
            Err(ValidationError::WrongContentType)
        }
    }

    /// Reject early when the client already told us the body is too big.
    pub fn check_content_length(&self, declared: Option<u64>) -> Result<(), ValidationError> {
        match declared {
            Some(len) if len > self.max_body_bytes as u64 => Err(ValidationError::BodyTooLarge),
            _ => Ok(()),
        }
    }

    /// Buffer the body, failing once it grows past the limit.
    pub async fn read_body(&self, body: Body) -> Result<Bytes, ValidationError> {
        axum::body::to_bytes(body, self.max_body_bytes)
            .await
            .map_err(|err| {
                if exceeded_limit(&err) {
                    ValidationError::BodyTooLarge
                } else {
                    ValidationError::Internal(err.to_string())
                }
            })
    }

    /// Decode and check a complete request body.
    pub fn decode(&self, raw: &[u8]) -> Result<CanonicalMessage, ValidationError> {
        if raw.iter().all(|b| matches!(b, b' ' | b'\n' | b'\r' | b'\t')) {
            return Err(ValidationError::EmptyBody);
        }

        let trace = DecodeTrace::default();
        let mut de = serde_json::Deserializer::from_slice(raw);
        let envelope = EnvelopeSeed { trace: &trace }
            .deserialize(&mut de)
            .map_err(|err| classify(raw, &trace, err))?;
        de.end().map_err(|_| ValidationError::TrailingData)?;

        if envelope.topic.is_empty() {
            return Err(ValidationError::MissingTopic);
        }
        if !self.topics.contains(&envelope.topic) {
            return Err(ValidationError::UnknownTopic);
        }

        let value_str = envelope.value_str.filter(|s| !s.is_empty());
        let payload = match (envelope.value, value_str) {
            (Some(_), Some(_)) => return Err(ValidationError::ConflictingValue),
            (None, None) => return Err(ValidationError::MissingValue),
            (Some(MessageValue::Text(text)), None) | (None, Some(text)) => Bytes::from(text),
            (Some(MessageValue::Structured(value)), None) => serde_json::to_vec(&value)
                .map(Bytes::from)
                .map_err(|e| ValidationError::Internal(e.to_string()))?,
        };

        let key = envelope.key.unwrap_or_default();
        CanonicalMessage::new(&self.topics, envelope.topic, key, payload)
            .ok_or(ValidationError::UnknownTopic)
    }
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

fn exceeded_limit(err: &axum::Error) -> bool {
    let mut source: Option<&(dyn std::error::Error + 'static)> = Some(err);
    while let Some(e) = source {
        if e.is::<LengthLimitError>() {
            return true;
        }
        source = e.source();
    }
    false
}

// ─────────────────────────────────────────────────────────────────────────────
// Envelope decoding
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Envelope {
    topic: String,
    key: Option<String>,
    value: Option<MessageValue>,
    value_str: Option<String>,
}

/// Strings are tried first so they reach the broker without JSON quoting.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MessageValue {
    Text(String),
    Structured(Value),
}

/// What the decoder was looking at when it failed.
#[derive(Debug, Default)]
struct DecodeTrace {
    field: Cell<Option<&'static str>>,
    unknown: RefCell<Option<String>>,
}

struct EnvelopeSeed<'a> {
    trace: &'a DecodeTrace,
}

impl<'de> DeserializeSeed<'de> for EnvelopeSeed<'_> {
    type Value = Envelope;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Envelope, D::Error> {
        deserializer.deserialize_map(EnvelopeVisitor { trace: self.trace })
    }
}

struct EnvelopeVisitor<'a> {
    trace: &'a DecodeTrace,
}

impl EnvelopeVisitor<'_> {
    fn field<'de, A, T>(&self, map: &mut A, name: &'static str) -> Result<T, A::Error>
    where
        A: MapAccess<'de>,
        T: Deserialize<'de>,
    {
        self.trace.field.set(Some(name));
        let value = map.next_value()?;
        self.trace.field.set(None);
        Ok(value)
    }
}

impl<'de> Visitor<'de> for EnvelopeVisitor<'_> {
    type Value = Envelope;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a JSON object")
    }

    // Repeated keys: the last occurrence wins.
    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Envelope, A::Error> {
        let mut envelope = Envelope::default();
        while let Some(name) = map.next_key::<String>()? {
            match name.as_str() {
                "topic" => {
                    let topic: Option<String> = self.field(&mut map, "topic")?;
                    envelope.topic = topic.unwrap_or_default();
                }
                "key" => envelope.key = self.field(&mut map, "key")?,
                "value" => envelope.value = self.field(&mut map, "value")?,
                "value_str" => envelope.value_str = self.field(&mut map, "value_str")?,
                _ => {
                    let err: A::Error = de::Error::unknown_field(&name, FIELDS);
                    self.trace.unknown.replace(Some(name));
                    return Err(err);
                }
            }
        }
        Ok(envelope)
    }
}

fn classify(raw: &[u8], trace: &DecodeTrace, err: serde_json::Error) -> ValidationError {
    match err.classify() {
        Category::Eof => ValidationError::MalformedJson { offset: None },
        Category::Syntax => ValidationError::MalformedJson {
            offset: Some(byte_offset(raw, err.line(), err.column())),
        },
        Category::Data => match trace.unknown.take() {
            Some(name) => ValidationError::UnknownField(name),
            None => ValidationError::InvalidFieldType {
                field: trace.field.get().unwrap_or_default().to_string(),
                offset: byte_offset(raw, err.line(), err.column()),
            },
        },
        Category::Io => ValidationError::Internal(err.to_string()),
    }
}

/// Turn serde_json's 1-based line and in-line column into a byte offset.
fn byte_offset(raw: &[u8], line: usize, column: usize) -> usize {
    let line_start = if line <= 1 {
        0
    } else {
        raw.iter()
            .enumerate()
            .filter(|(_, b)| **b == b'\n')
            .nth(line - 2)
            .map(|(i, _)| i + 1)
            .unwrap_or(raw.len())
    };
    (line_start + column).min(raw.len())
}
