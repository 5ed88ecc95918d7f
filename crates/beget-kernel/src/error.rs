//! Kernel error types.
//!
//! [`ConfigError`] covers everything detected while resolving configuration,
//! before any listener or broker connection exists. [`ProducerError`] covers
//! producer construction, per-message delivery and shutdown.

use thiserror::Error;

/// Startup-time configuration errors. Every variant is fatal to the process.
#[derive(Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("no configuration found at '{0}'")]
    NotFound(String),

    /// The configuration file could not be read.
    #[error("failed to read configuration '{path}': {message}")]
    Io { path: String, message: String },

    /// The file extension is not one of the supported formats.
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    /// The sources could not be merged or deserialized.
    #[error("error parsing configuration: {0}")]
    Parse(String),

    /// `kafka.topics` is empty.
    #[error("no topics provided")]
    NoTopicsConfigured,

    /// A topic name is empty or whitespace-only.
    #[error("invalid topic name '{0}'")]
    InvalidTopic(String),

    /// Deliver mode was requested without any broker address.
    #[error("no brokers provided")]
    NoBrokersConfigured,

    /// A scalar option is out of range.
    #[error("invalid option: {0}")]
    InvalidOption(String),
}

/// Producer errors.
///
/// Only [`ProducerError::Config`], [`ProducerError::Client`] and
/// [`ProducerError::DeliverUnavailable`] can be returned while constructing a
/// producer; the remaining variants are per-message or shutdown failures.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProducerError {
    /// The configuration does not allow a producer to be built.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The broker client could not be created.
    #[error("failed to create broker client: {0}")]
    Client(String),

    /// Deliver mode was requested but this build has no broker client.
    #[error("deliver mode requires the `kafka` feature")]
    DeliverUnavailable,

    /// The broker rejected or failed to acknowledge the message after the
    /// configured attempts.
    #[error("failed to deliver message to '{topic}': {message}")]
    Delivery { topic: String, message: String },

    /// The message could not be handed to the broker client in time.
    #[error("timed out enqueueing message for '{0}'")]
    Timeout(String),

    /// `publish` was called after `close`. This is a programming error.
    #[error("producer is closed")]
    Closed,

    /// The producer failed to drain within its shutdown bound.
    #[error("failed to close producer: {0}")]
    Shutdown(String),
}

impl ProducerError {
    /// `true` for errors that can only happen during construction.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            ProducerError::Config(_) | ProducerError::Client(_) | ProducerError::DeliverUnavailable
        )
    }
}
