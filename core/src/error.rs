//! Error types for the LighterBase table client.
//!
//! # Design
//! `Http` displays only the message so callers see exactly what the backend
//! reported (`"not found"`, not `"HTTP 404: not found"`). The status code is
//! still available on the variant for callers that branch on it.

use thiserror::Error;

/// Errors returned by `TableClient` construction, builders, parsers and
/// async operations.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client was configured with an unusable value (e.g. empty base URL).
    #[error("configuration error: {0}")]
    Config(String),

    /// The server returned a non-2xx status.
    ///
    /// `message` is the backend's `message` field when one could be parsed,
    /// otherwise a generic text embedding the status code.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// The request failed before any response was obtained.
    #[error("transport error: {0}")]
    Transport(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ApiError {
    /// Status code of an `Http` error, `None` for every other variant.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
