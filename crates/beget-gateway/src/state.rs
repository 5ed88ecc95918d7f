//! Shared application state threaded through every axum handler.

use crate::validate::RequestValidator;
use beget_kernel::Producer;
use std::sync::Arc;
use std::time::Duration;

/// Cheap to clone: both members are reference counted.
#[derive(Clone)]
pub struct AppState {
    /// Turns requests into canonical messages.
    pub validator: Arc<RequestValidator>,
    /// The single process-wide producer.
    pub producer: Arc<dyn Producer>,
    /// Upper bound for reading and validating one request.
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        validator: Arc<RequestValidator>,
        producer: Arc<dyn Producer>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            validator,
            producer,
            request_timeout,
        }
    }
}
