//! `POST /produce`.
//!
//! ```text
//! request ─▶ RequestValidator ─▶ CanonicalMessage ─▶ Producer::publish
//!                 │                                        │
//!                 └─ 4xx + reason                          └─ logged, still 200
//! ```
//!
//! Producer failures are not reported to the client: the gateway answers
//! `200 OK` once a message has been validated and handed over.
//!
//! `server.request_timeout_secs` bounds reading and validating the request
//! only (`408` when exceeded). A dispatched publish is never cut short by it;
//! its duration is bounded by the producer's own delivery timeout.

use crate::state::AppState;
use axum::body::Body;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Router, routing::post};
use std::sync::Arc;
use tracing::{debug, error};

pub fn produce_router() -> Router<AppState> {
    Router::new().route("/produce", post(produce))
}

async fn produce(State(state): State<AppState>, headers: HeaderMap, body: Body) -> Response {
    let validated =
        tokio::time::timeout(state.request_timeout, state.validator.validate(&headers, body)).await;

    let message = match validated {
        Ok(Ok(message)) => message,
        Ok(Err(err)) => {
            debug!(status = err.status().as_u16(), reason = %err, "rejected produce request");
            return err.into_response();
        }
        Err(_) => {
            debug!(
                timeout_ms = state.request_timeout.as_millis() as u64,
                "produce request not read in time"
            );
            return StatusCode::REQUEST_TIMEOUT.into_response();
        }
    };

    let topic = message.topic().to_string();
    let producer = Arc::clone(&state.producer);

    // Detached: a client disconnect must not cancel an in-flight publish.
    let publish = tokio::spawn(async move { producer.publish(message).await });
    match publish.await {
        Ok(Ok(())) => {}
        Ok(Err(err)) => error!(topic = %topic, error = %err, "failed to write kafka message"),
        Err(err) => error!(topic = %topic, error = %err, "publish task failed"),
    }

    "OK".into_response()
}
