//! `beget-gateway`: HTTP ingestion gateway runtime.
//!
//! Accepts `POST /produce` requests carrying a JSON envelope, validates them
//! into a [`CanonicalMessage`](beget_kernel::CanonicalMessage) and hands the
//! message to the process-wide [`Producer`](beget_kernel::Producer):
//!
//! | Kernel contract | Implementation |
//! |----------------|----------------|
//! | request validation | [`validate::RequestValidator`] |
//! | [`Producer`](beget_kernel::Producer), observe mode | [`producer::ObserveProducer`] |
//! | [`Producer`](beget_kernel::Producer), deliver mode | `producer::KafkaProducer` (feature `kafka`) |
//!
//! [`server::GatewayServer`] wires everything together into an axum HTTP
//! service.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use beget_gateway::{producer, server::{GatewayServer, shutdown_signal}};
//! use beget_kernel::Config;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Arc::new(Config::new(["orders"]));
//!     let producer = producer::connect(&config).unwrap();
//!     let server = GatewayServer::new(config, producer.clone()).unwrap();
//!
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await.unwrap();
//!     server.serve(listener, shutdown_signal()).await.unwrap();
//!     producer.close().await.unwrap();
//! }
//! ```

pub mod error;
pub mod handlers;
pub mod logging;
pub mod producer;
pub mod server;
pub mod state;
pub mod validate;

// Re-export the kernel so callers need a single dependency.
pub use beget_kernel as kernel;
