//! Process configuration.
//!
//! [`Config`] is resolved exactly once at startup (see [`load`]) and shared
//! read-only for the lifetime of the process. Every section derives
//! `#[serde(default)]`, so a file only needs to name what differs from the
//! defaults. Call [`Config::validate()`] before building anything from it;
//! [`load`] does this for you.
//!
//! Options under `kafka` that are left at zero (or absent) are not passed to
//! the broker client, which then applies its own default.

mod loader;

pub use loader::{ENV_PREFIX, detect_format, from_str, load, load_with_env};

use crate::error::ConfigError;
use serde::de::{self, Visitor};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// RunMode
// ─────────────────────────────────────────────────────────────────────────────

/// Whether published messages are only observed locally or delivered to the
/// broker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum RunMode {
    /// Log and record messages; never touch the network.
    #[default]
    #[serde(rename = "debug", alias = "observe")]
    Observe,
    /// Forward messages to the configured brokers.
    #[serde(rename = "release", alias = "deliver")]
    Deliver,
}

impl RunMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunMode::Observe => "debug",
            RunMode::Deliver => "release",
        }
    }
}

impl fmt::Display for RunMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// RequiredAcks
// ─────────────────────────────────────────────────────────────────────────────

/// Number of replica acknowledgements required before a produce request is
/// considered successful.
///
/// Accepts `none`/`leader`/`all` as well as the numeric forms `0`/`1`/`-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequiredAcks {
    /// Do not wait for any acknowledgement.
    None,
    /// Wait for the partition leader.
    Leader,
    /// Wait for the full in-sync replica set.
    All,
}

impl RequiredAcks {
    /// Value of the broker client's `acks` property.
    pub fn as_client_value(&self) -> &'static str {
        match self {
            RequiredAcks::None => "0",
            RequiredAcks::Leader => "1",
            RequiredAcks::All => "all",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "0" => Some(RequiredAcks::None),
            "leader" | "one" | "1" => Some(RequiredAcks::Leader),
            "all" | "-1" => Some(RequiredAcks::All),
            _ => None,
        }
    }

    fn from_number(n: i64) -> Option<Self> {
        match n {
            0 => Some(RequiredAcks::None),
            1 => Some(RequiredAcks::Leader),
            -1 => Some(RequiredAcks::All),
            _ => None,
        }
    }
}

impl Serialize for RequiredAcks {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(match self {
            RequiredAcks::None => "none",
            RequiredAcks::Leader => "leader",
            RequiredAcks::All => "all",
        })
    }
}

impl<'de> Deserialize<'de> for RequiredAcks {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct AcksVisitor;

        impl Visitor<'_> for AcksVisitor {
            type Value = RequiredAcks;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("one of none, leader, all, 0, 1, -1")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
                RequiredAcks::parse(v).ok_or_else(|| E::invalid_value(de::Unexpected::Str(v), &self))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
                RequiredAcks::from_number(v)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Signed(v), &self))
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
                i64::try_from(v)
                    .ok()
                    .and_then(RequiredAcks::from_number)
                    .ok_or_else(|| E::invalid_value(de::Unexpected::Unsigned(v), &self))
            }
        }

        deserializer.deserialize_any(AcksVisitor)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sections
// ─────────────────────────────────────────────────────────────────────────────

/// `app` section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub mode: RunMode,
}

/// `server` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// TCP port to listen on (default: 8080).
    pub port: u16,
    /// Upper bound for validating and answering one request (default: 30s).
    pub request_timeout_secs: u64,
    /// Grace period for in-flight requests after a shutdown signal (default: 5s).
    pub shutdown_grace_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            request_timeout_secs: 30,
            shutdown_grace_secs: 5,
        }
    }
}

impl ServerConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// `log` section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter directive, used when `RUST_LOG` is not set.
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Broker-client tuning knobs. Zero means "use the client default".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProducerOptions {
    /// Optional client identifier reported to the brokers.
    pub client_id: Option<String>,
    /// Maximum delivery attempts per message (client default: 10 retries).
    pub max_attempts: u32,
    /// Smallest wait between attempts, in milliseconds.
    pub write_backoff_min_ms: u64,
    /// Largest wait between attempts, in milliseconds.
    pub write_backoff_max_ms: u64,
    /// Messages buffered per batch.
    pub batch_size: u32,
    /// Bytes buffered per batch.
    pub batch_bytes: u64,
    /// How often incomplete batches are flushed, in milliseconds.
    pub batch_timeout_ms: u64,
    /// Network read timeout, in milliseconds.
    pub read_timeout_ms: u64,
    /// Produce request timeout, in milliseconds. Also bounds how long a
    /// synchronous publish waits to enqueue.
    pub write_timeout_ms: u64,
    /// Acknowledgement level; `None` keeps the client default.
    pub required_acks: Option<RequiredAcks>,
    /// Fire-and-forget: `publish` returns before the broker acknowledges.
    #[serde(rename = "async")]
    pub fire_and_forget: bool,
    /// Let the brokers create missing topics on first produce.
    pub allow_auto_topic_creation: bool,
    /// Upper bound for draining in-flight messages on close (default: 10s).
    pub close_timeout_ms: u64,
}

impl Default for ProducerOptions {
    fn default() -> Self {
        Self {
            client_id: None,
            max_attempts: 0,
            write_backoff_min_ms: 0,
            write_backoff_max_ms: 0,
            batch_size: 0,
            batch_bytes: 0,
            batch_timeout_ms: 0,
            read_timeout_ms: 0,
            write_timeout_ms: 0,
            required_acks: None,
            fire_and_forget: false,
            allow_auto_topic_creation: false,
            close_timeout_ms: 10_000,
        }
    }
}

fn millis(ms: u64) -> Option<Duration> {
    (ms > 0).then(|| Duration::from_millis(ms))
}

impl ProducerOptions {
    pub fn write_timeout(&self) -> Option<Duration> {
        millis(self.write_timeout_ms)
    }

    pub fn read_timeout(&self) -> Option<Duration> {
        millis(self.read_timeout_ms)
    }

    pub fn batch_timeout(&self) -> Option<Duration> {
        millis(self.batch_timeout_ms)
    }

    pub fn close_timeout(&self) -> Duration {
        millis(self.close_timeout_ms).unwrap_or(Duration::from_secs(10))
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.write_backoff_min_ms > 0
            && self.write_backoff_max_ms > 0
            && self.write_backoff_min_ms > self.write_backoff_max_ms
        {
            return Err(ConfigError::InvalidOption(format!(
                "kafka.write_backoff_min_ms ({}) exceeds kafka.write_backoff_max_ms ({})",
                self.write_backoff_min_ms, self.write_backoff_max_ms
            )));
        }
        Ok(())
    }
}

/// `kafka` section: allowlist, brokers and producer options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KafkaConfig {
    /// Topics that may be produced to. Must not be empty.
    pub topics: Vec<String>,
    /// `host:port` bootstrap addresses. Required in deliver mode.
    pub brokers: Vec<String>,
    #[serde(flatten)]
    pub producer: ProducerOptions,
}

// ─────────────────────────────────────────────────────────────────────────────
// Config
// ─────────────────────────────────────────────────────────────────────────────

/// Fully resolved process configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub app: AppConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
    pub kafka: KafkaConfig,
}

impl Config {
    /// Observe-mode config allowing the given topics.
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_topics(topics)
    }

    /// Builder: replace the topic allowlist.
    pub fn with_topics<I, S>(mut self, topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kafka.topics = topics.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: replace the broker list.
    pub fn with_brokers<I, S>(mut self, brokers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.kafka.brokers = brokers.into_iter().map(Into::into).collect();
        self
    }

    /// Builder: set the run mode.
    pub fn with_mode(mut self, mode: RunMode) -> Self {
        self.app.mode = mode;
        self
    }

    /// Builder: set the listening port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.server.port = port;
        self
    }

    /// Builder: replace the producer options.
    pub fn with_producer_options(mut self, options: ProducerOptions) -> Self {
        self.kafka.producer = options;
        self
    }

    pub fn mode(&self) -> RunMode {
        self.app.mode
    }

    /// Broker addresses with blank entries removed.
    pub fn brokers(&self) -> impl Iterator<Item = &str> {
        self.kafka
            .brokers
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
    }

    /// Check the invariants every later component relies on.
    ///
    /// Checks performed (in order):
    /// 1. At least one topic is configured.
    /// 2. No topic name is blank.
    /// 3. Deliver mode has at least one broker.
    /// 4. The listening port is non-zero.
    /// 5. Producer option ranges are coherent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.validate_topics()?;
        self.validate_brokers()?;

        if self.server.port == 0 {
            return Err(ConfigError::InvalidOption(
                "server.port must be greater than 0".to_string(),
            ));
        }

        self.kafka.producer.validate()
    }

    pub fn validate_topics(&self) -> Result<(), ConfigError> {
        if self.kafka.topics.is_empty() {
            return Err(ConfigError::NoTopicsConfigured);
        }
        if let Some(blank) = self.kafka.topics.iter().find(|t| t.trim().is_empty()) {
            return Err(ConfigError::InvalidTopic(blank.clone()));
        }
        Ok(())
    }

    /// Deliver mode needs somewhere to deliver to.
    pub fn validate_brokers(&self) -> Result<(), ConfigError> {
        if self.mode() == RunMode::Deliver && self.brokers().next().is_none() {
            return Err(ConfigError::NoBrokersConfigured);
        }
        Ok(())
    }
}
