//! Gateway error types.
//!
//! [`ValidationError`] is the only error a client ever sees. Its `Display`
//! output is the exact response text, and its [`IntoResponse`] impl renders
//! it as a `text/plain` body terminated by a newline.

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use std::time::Duration;
use thiserror::Error;

/// Why a `POST /produce` request was rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("missing Content-Type header")]
    MissingContentType,

    #[error("Content-Type header is not application/json")]
    WrongContentType,

    #[error("Request body must not be larger than 1MB")]
    BodyTooLarge,

    /// Invalid JSON syntax. `offset` is the byte position of the failure;
    /// `None` when the body ended early.
    #[error("Request body contains badly-formed JSON{}", at_position(.offset))]
    MalformedJson { offset: Option<usize> },

    /// A known field (or the root, when `field` is empty) has the wrong
    /// JSON type.
    #[error("{}", invalid_type(.field, .offset))]
    InvalidFieldType { field: String, offset: usize },

    #[error("Request body contains unknown field \"{0}\"")]
    UnknownField(String),

    #[error("Request body must not be empty")]
    EmptyBody,

    #[error("Request body must only contain a single JSON object")]
    TrailingData,

    #[error("missing topic")]
    MissingTopic,

    #[error("invalid topic")]
    UnknownTopic,

    #[error("missing message value")]
    MissingValue,

    #[error("Request body must not set both \"value\" and \"value_str\"")]
    ConflictingValue,

    /// Failure on our side while reading the request. The detail is logged,
    /// never returned to the client.
    #[error("Internal Server Error")]
    Internal(String),
}

fn at_position(offset: &Option<usize>) -> String {
    match offset {
        Some(n) => format!(" (at position {n})"),
        None => String::new(),
    }
}

fn invalid_type(field: &str, offset: &usize) -> String {
    if field.is_empty() {
        format!("Request body must be a JSON object (at position {offset})")
    } else {
        format!(
            "Request body contains an invalid value for the \"{field}\" field (at position {offset})"
        )
    }
}

impl ValidationError {
    pub fn status(&self) -> StatusCode {
        match self {
            ValidationError::MissingContentType | ValidationError::WrongContentType => {
                StatusCode::UNSUPPORTED_MEDIA_TYPE
            }
            ValidationError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ValidationError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ValidationError {
    fn into_response(self) -> Response {
        if let ValidationError::Internal(detail) = &self {
            tracing::error!(error = %detail, "failed to read produce request");
        }
        (
            self.status(),
            [
                (
                    header::CONTENT_TYPE,
                    HeaderValue::from_static("text/plain; charset=utf-8"),
                ),
                (
                    header::X_CONTENT_TYPE_OPTIONS,
                    HeaderValue::from_static("nosniff"),
                ),
            ],
            format!("{self}\n"),
        )
            .into_response()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors from running the HTTP server.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServeError {
    #[error("server I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// In-flight requests did not finish within the shutdown grace period.
    #[error("server forced to shutdown after {0:?}")]
    GraceExpired(Duration),
}
