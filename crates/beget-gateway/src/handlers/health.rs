//! Liveness endpoint.
//!
//! `GET /healthz` answers `200 OK` with the body `OK` whenever the process
//! can serve HTTP. It does not touch the producer.

use crate::state::AppState;
use axum::{Router, routing::get};

pub fn health_router() -> Router<AppState> {
    Router::new().route("/healthz", get(healthz))
}

async fn healthz() -> &'static str {
    "OK"
}
