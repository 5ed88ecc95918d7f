//! Deliver-mode producer backed by librdkafka.
//!
//! One [`FutureProducer`] is shared by every request. Batching, retries and
//! acknowledgements are handled by the client according to the options in
//! [`ProducerOptions`](beget_kernel::ProducerOptions):
//!
//! | Option | librdkafka property |
//! |--------|---------------------|
//! | `client_id` | `client.id` |
//! | `max_attempts` | `message.send.max.retries` (attempts - 1) |
//! | `write_backoff_min_ms` | `retry.backoff.ms` |
//! | `write_backoff_max_ms` | `retry.backoff.max.ms` |
//! | `batch_size` | `batch.num.messages` |
//! | `batch_bytes` | `batch.size` |
//! | `batch_timeout_ms` | `linger.ms` |
//! | `read_timeout_ms` | `socket.timeout.ms` |
//! | `write_timeout_ms` | `request.timeout.ms` |
//! | `write_timeout_ms` x `max_attempts` + `batch_timeout_ms` | `message.timeout.ms` |
//! | `required_acks` | `acks` |
//! | `allow_auto_topic_creation` | `allow.auto.create.topics` |
//!
//! Zero or unset options keep the librdkafka default.

use async_trait::async_trait;
use beget_kernel::{CanonicalMessage, Config, Lifecycle, Producer, ProducerError, RunMode};
use rdkafka::ClientConfig;
use rdkafka::error::{KafkaError, RDKafkaErrorCode};
use rdkafka::producer::{FutureProducer, FutureRecord, Producer as _};
use rdkafka::util::Timeout;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Enqueue bound for synchronous publishes when `write_timeout_ms` is unset.
const DEFAULT_ENQUEUE_TIMEOUT: Duration = Duration::from_secs(10);

/// Translate the gateway configuration into librdkafka properties.
pub fn client_config(config: &Config) -> ClientConfig {
    let options = &config.kafka.producer;
    let mut client = ClientConfig::new();
    client.set(
        "bootstrap.servers",
        config.brokers().collect::<Vec<_>>().join(","),
    );

    if let Some(id) = options.client_id.as_deref().filter(|id| !id.is_empty()) {
        client.set("client.id", id);
    }
    if options.max_attempts > 0 {
        client.set(
            "message.send.max.retries",
            (options.max_attempts - 1).to_string(),
        );
    }
    if options.write_backoff_min_ms > 0 {
        client.set("retry.backoff.ms", options.write_backoff_min_ms.to_string());
    }
    if options.write_backoff_max_ms > 0 {
        client.set(
            "retry.backoff.max.ms",
            options.write_backoff_max_ms.to_string(),
        );
    }
    if options.batch_size > 0 {
        client.set("batch.num.messages", options.batch_size.to_string());
    }
    if options.batch_bytes > 0 {
        client.set("batch.size", options.batch_bytes.to_string());
    }
    if let Some(linger) = options.batch_timeout() {
        client.set("linger.ms", linger.as_millis().to_string());
    }
    if let Some(read) = options.read_timeout() {
        client.set("socket.timeout.ms", read.as_millis().to_string());
    }
    if let Some(write) = options.write_timeout() {
        client.set("request.timeout.ms", write.as_millis().to_string());
        // Bounds the whole delivery, retries and linger included.
        let linger = options.batch_timeout().unwrap_or_default();
        let delivery = write * options.max_attempts.max(1) + linger;
        client.set("message.timeout.ms", delivery.as_millis().to_string());
    }
    if let Some(acks) = options.required_acks {
        client.set("acks", acks.as_client_value());
    }
    if options.allow_auto_topic_creation {
        client.set("allow.auto.create.topics", "true");
    }
    client
}

/// Producer that delivers to a Kafka cluster.
pub struct KafkaProducer {
    producer: FutureProducer,
    lifecycle: Lifecycle,
    fire_and_forget: bool,
    enqueue_timeout: Duration,
    close_timeout: Duration,
}

impl KafkaProducer {
    pub fn new(config: &Config) -> Result<Self, ProducerError> {
        config.validate_brokers()?;
        let options = &config.kafka.producer;

        let producer: FutureProducer = client_config(config)
            .create()
            .map_err(|e| ProducerError::Client(e.to_string()))?;

        Ok(Self {
            producer,
            lifecycle: Lifecycle::new(),
            fire_and_forget: options.fire_and_forget,
            enqueue_timeout: options.write_timeout().unwrap_or(DEFAULT_ENQUEUE_TIMEOUT),
            close_timeout: options.close_timeout(),
        })
    }

    pub fn is_fire_and_forget(&self) -> bool {
        self.fire_and_forget
    }

    /// Hand the record to librdkafka and log the delivery report in the
    /// background.
    fn enqueue(&self, topic: String, key: &[u8], payload: &[u8]) -> Result<(), ProducerError> {
        let mut record = FutureRecord::<[u8], [u8]>::to(&topic).payload(payload);
        if !key.is_empty() {
            record = record.key(key);
        }

        let delivery = self
            .producer
            .send_result(record)
            .map_err(|(err, _)| failure(&topic, err))?;

        tokio::spawn(async move {
            match delivery.await {
                Ok(Ok((partition, offset))) => {
                    debug!(topic = %topic, partition, offset, "message delivered");
                }
                Ok(Err((err, _))) => {
                    error!(topic = %topic, error = %err, "failed to write kafka message");
                }
                Err(_) => {
                    warn!(topic = %topic, "delivery report dropped before completion");
                }
            }
        });
        Ok(())
    }
}

fn failure(topic: &str, err: KafkaError) -> ProducerError {
    match err.rdkafka_error_code() {
        Some(RDKafkaErrorCode::QueueFull) => ProducerError::Timeout(topic.to_string()),
        _ => ProducerError::Delivery {
            topic: topic.to_string(),
            message: err.to_string(),
        },
    }
}

#[async_trait]
impl Producer for KafkaProducer {
    fn mode(&self) -> RunMode {
        RunMode::Deliver
    }

    async fn publish(&self, message: CanonicalMessage) -> Result<(), ProducerError> {
        if let Err(err) = self.lifecycle.ensure_ready() {
            error!(topic = message.topic(), "publish called on a closed producer");
            return Err(err);
        }

        let (topic, key, payload) = message.into_parts();
        if self.fire_and_forget {
            return self.enqueue(topic, &key, &payload);
        }

        let mut record = FutureRecord::<[u8], [u8]>::to(&topic).payload(&payload[..]);
        if !key.is_empty() {
            record = record.key(&key[..]);
        }

        match self
            .producer
            .send(record, Timeout::After(self.enqueue_timeout))
            .await
        {
            Ok((partition, offset)) => {
                debug!(topic = %topic, partition, offset, "message delivered");
                Ok(())
            }
            Err((err, _)) => Err(failure(&topic, err)),
        }
    }

    async fn close(&self) -> Result<(), ProducerError> {
        if !self.lifecycle.begin_close() {
            return Ok(());
        }

        let timeout = self.close_timeout;
        let producer = self.producer.clone();
        info!(
            in_flight = producer.in_flight_count(),
            timeout_ms = timeout.as_millis() as u64,
            "flushing kafka producer"
        );

        let flushed =
            tokio::task::spawn_blocking(move || producer.flush(Timeout::After(timeout))).await;
        self.lifecycle.finish_close();

        match flushed {
            Ok(Ok(())) => {
                info!("kafka producer closed");
                Ok(())
            }
            Ok(Err(err)) => Err(ProducerError::Shutdown(err.to_string())),
            Err(join) => Err(ProducerError::Shutdown(join.to_string())),
        }
    }
}
