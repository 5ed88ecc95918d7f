//! Producer implementations and the startup factory.
//!
//! | Mode | Producer |
//! |------|----------|
//! | observe (`debug`) | [`ObserveProducer`]: logs and records, no network I/O |
//! | deliver (`release`) | `KafkaProducer`: librdkafka client, feature `kafka` |

mod observe;
#[cfg(feature = "kafka")]
mod kafka;

pub use observe::{DEFAULT_JOURNAL_CAPACITY, ObserveProducer};
#[cfg(feature = "kafka")]
pub use kafka::{KafkaProducer, client_config};

use beget_kernel::{Config, Producer, ProducerError, RunMode};
use std::sync::Arc;
use tracing::info;

/// Build the producer selected by `config.app.mode`.
///
/// Fails with [`ProducerError::Config`] when no topics are configured, or
/// when deliver mode has no brokers.
pub fn connect(config: &Config) -> Result<Arc<dyn Producer>, ProducerError> {
    config.validate_topics()?;
    config.validate_brokers()?;

    match config.mode() {
        RunMode::Observe => {
            info!("observe mode: messages are logged, not delivered");
            Ok(Arc::new(ObserveProducer::new()))
        }
        RunMode::Deliver => deliver(config),
    }
}

#[cfg(feature = "kafka")]
fn deliver(config: &Config) -> Result<Arc<dyn Producer>, ProducerError> {
    let producer = KafkaProducer::new(config)?;
    info!(
        brokers = %config.brokers().collect::<Vec<_>>().join(","),
        fire_and_forget = config.kafka.producer.fire_and_forget,
        "deliver mode: kafka producer ready"
    );
    Ok(Arc::new(producer))
}

#[cfg(not(feature = "kafka"))]
fn deliver(_config: &Config) -> Result<Arc<dyn Producer>, ProducerError> {
    Err(ProducerError::DeliverUnavailable)
}
