//! Topic allowlist.

use crate::config::Config;
use crate::error::ConfigError;
use std::collections::HashSet;

/// Immutable set of topics that may be produced to.
///
/// Membership is an exact, case-sensitive match. Iteration yields topics in
/// the order they were configured, without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicRegistry {
    members: HashSet<String>,
    ordered: Vec<String>,
}

impl TopicRegistry {
    /// Build a registry from topic names.
    ///
    /// Fails with [`ConfigError::NoTopicsConfigured`] when `topics` is empty
    /// and with [`ConfigError::InvalidTopic`] for a blank name.
    pub fn new<I, S>(topics: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut members = HashSet::new();
        let mut ordered = Vec::new();
        for topic in topics {
            let topic = topic.into();
            if topic.trim().is_empty() {
                return Err(ConfigError::InvalidTopic(topic));
            }
            if members.insert(topic.clone()) {
                ordered.push(topic);
            }
        }

        if ordered.is_empty() {
            return Err(ConfigError::NoTopicsConfigured);
        }
        Ok(Self { members, ordered })
    }

    /// Build the registry from `kafka.topics`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate_topics()?;
        Self::new(config.kafka.topics.iter().cloned())
    }

    pub fn contains(&self, topic: &str) -> bool {
        self.members.contains(topic)
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.ordered.iter().map(String::as_str)
    }
}
