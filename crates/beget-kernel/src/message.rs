//! Broker-ready message.

use crate::topics::TopicRegistry;
use bytes::Bytes;

/// A validated, normalized message ready to be handed to a [`Producer`].
///
/// Can only be built against a [`TopicRegistry`], so it always names an
/// allowed topic. `key` is empty when the caller did not provide one.
///
/// [`Producer`]: crate::producer::Producer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalMessage {
    topic: String,
    key: Bytes,
    payload: Bytes,
}

impl CanonicalMessage {
    /// Returns `None` when `topic` is not in `registry`.
    pub fn new(
        registry: &TopicRegistry,
        topic: impl Into<String>,
        key: impl Into<Bytes>,
        payload: impl Into<Bytes>,
    ) -> Option<Self> {
        let topic = topic.into();
        if !registry.contains(&topic) {
            return None;
        }
        Some(Self {
            topic,
            key: key.into(),
            payload: payload.into(),
        })
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn key(&self) -> &[u8] {
        &self.key
    }

    pub fn has_key(&self) -> bool {
        !self.key.is_empty()
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Split into `(topic, key, payload)`.
    pub fn into_parts(self) -> (String, Bytes, Bytes) {
        (self.topic, self.key, self.payload)
    }
}
