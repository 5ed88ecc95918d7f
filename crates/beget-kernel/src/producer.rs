//! The publish capability.
//!
//! A [`Producer`] is built once at startup and shared by every request
//! handler. Implementations must accept unsynchronized concurrent calls to
//! [`Producer::publish`]; callers never lock around it.
//!
//! ```text
//! Ready ──close()──▶ Closed
//!   │                  │
//!   └─ publish() ok    └─ publish() → ProducerError::Closed
//! ```

use crate::config::RunMode;
use crate::error::ProducerError;
use crate::message::CanonicalMessage;
use async_trait::async_trait;
use std::sync::atomic::{AtomicU8, Ordering};

/// Hands [`CanonicalMessage`]s to their destination.
#[async_trait]
pub trait Producer: Send + Sync {
    /// The mode this producer was built for.
    fn mode(&self) -> RunMode;

    /// Publish one message.
    ///
    /// Returns the terminal delivery error, if any, when the producer waits
    /// for acknowledgements; fire-and-forget producers return once the
    /// message is enqueued. Calling this after [`close`](Self::close) yields
    /// [`ProducerError::Closed`].
    async fn publish(&self, message: CanonicalMessage) -> Result<(), ProducerError>;

    /// Release the underlying resources, draining in-flight messages within
    /// the producer's own bound. Closing an already closed producer is a
    /// no-op.
    async fn close(&self) -> Result<(), ProducerError>;
}

const READY: u8 = 0;
const CLOSING: u8 = 1;
const CLOSED: u8 = 2;

/// Lock-free `Ready → Closing → Closed` state shared by producer
/// implementations.
#[derive(Debug, Default)]
pub struct Lifecycle {
    state: AtomicU8,
}

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.state.load(Ordering::Acquire) == READY
    }

    pub fn is_closed(&self) -> bool {
        self.state.load(Ordering::Acquire) == CLOSED
    }

    /// `Err(ProducerError::Closed)` unless still ready.
    pub fn ensure_ready(&self) -> Result<(), ProducerError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(ProducerError::Closed)
        }
    }

    /// Move from `Ready` to `Closing`. Only the first caller gets `true`.
    pub fn begin_close(&self) -> bool {
        self.state
            .compare_exchange(READY, CLOSING, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    pub fn finish_close(&self) {
        self.state.store(CLOSED, Ordering::Release);
    }
}
