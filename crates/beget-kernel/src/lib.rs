//! `beget-kernel`: contracts for the Beget HTTP-to-Kafka ingestion gateway.
//!
//! The kernel holds everything that is independent of the HTTP surface and of
//! the broker client:
//!
//! | Concern | Type |
//! |---------|------|
//! | Process configuration | [`Config`], [`RunMode`], [`ProducerOptions`] |
//! | Topic allowlist | [`TopicRegistry`] |
//! | Broker-ready message | [`CanonicalMessage`] |
//! | Publish capability | [`Producer`] |
//!
//! Concrete producers and the axum server live in `beget-gateway`.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use beget_kernel::{config, TopicRegistry};
//!
//! let cfg = config::load("config.yaml").expect("configuration");
//! let topics = TopicRegistry::from_config(&cfg).expect("topics");
//! assert!(!topics.is_empty());
//! ```

pub mod config;
pub mod error;
pub mod message;
pub mod producer;
pub mod topics;

pub use config::{
    AppConfig, Config, KafkaConfig, LogConfig, LogFormat, ProducerOptions, RequiredAcks,
    RunMode, ServerConfig,
};
pub use error::{ConfigError, ProducerError};
pub use message::CanonicalMessage;
pub use producer::{Lifecycle, Producer};
pub use topics::TopicRegistry;
