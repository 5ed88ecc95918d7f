//! HTTP handlers.

pub mod health;
pub mod produce;

pub use health::health_router;
pub use produce::produce_router;
