//! Observe-mode producer: logs every message instead of delivering it.

use async_trait::async_trait;
use beget_kernel::{CanonicalMessage, Lifecycle, Producer, ProducerError, RunMode};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, error, info};

/// Messages kept by [`ObserveProducer::recent`] by default.
pub const DEFAULT_JOURNAL_CAPACITY: usize = 64;

/// Producer for local development. Never opens a network connection.
///
/// Every message is logged at `DEBUG`, counted, and kept in a small ring
/// buffer so tests and operators can see what would have been sent.
#[derive(Debug)]
pub struct ObserveProducer {
    lifecycle: Lifecycle,
    published: AtomicU64,
    journal: Mutex<VecDeque<CanonicalMessage>>,
    capacity: usize,
}

impl Default for ObserveProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl ObserveProducer {
    pub fn new() -> Self {
        Self::with_journal_capacity(DEFAULT_JOURNAL_CAPACITY)
    }

    /// A capacity of `0` disables the journal; messages are still counted.
    pub fn with_journal_capacity(capacity: usize) -> Self {
        Self {
            lifecycle: Lifecycle::new(),
            published: AtomicU64::new(0),
            journal: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Total messages accepted since startup.
    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }

    /// The most recent messages, oldest first.
    pub fn recent(&self) -> Vec<CanonicalMessage> {
        self.journal.lock().iter().cloned().collect()
    }

    pub fn is_closed(&self) -> bool {
        self.lifecycle.is_closed()
    }
}

#[async_trait]
impl Producer for ObserveProducer {
    fn mode(&self) -> RunMode {
        RunMode::Observe
    }

    async fn publish(&self, message: CanonicalMessage) -> Result<(), ProducerError> {
        if let Err(err) = self.lifecycle.ensure_ready() {
            error!(topic = message.topic(), "publish called on a closed producer");
            return Err(err);
        }

        debug!(
            topic = message.topic(),
            key = %String::from_utf8_lossy(message.key()),
            payload = %String::from_utf8_lossy(message.payload()),
            payload_len = message.payload().len(),
            "PRODUCE"
        );

        self.published.fetch_add(1, Ordering::Relaxed);
        if self.capacity > 0 {
            let mut journal = self.journal.lock();
            if journal.len() == self.capacity {
                journal.pop_front();
            }
            journal.push_back(message);
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), ProducerError> {
        if self.lifecycle.begin_close() {
            self.lifecycle.finish_close();
            info!(published = self.published_count(), "observe producer closed");
        }
        Ok(())
    }
}
