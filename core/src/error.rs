//! Error types for the Plaid API client.
//!
//! # Design
//! Configuration problems are fatal and surface when a `ClientConfig` is
//! built. Everything else is a per-call failure returned from `send` and the
//! public operations. `NotFound` gets a dedicated variant because reference
//! lookups with an unknown id are the common case; other non-2xx responses
//! land in `HttpError` with the raw status and body.

use thiserror::Error;

/// Errors returned by `PlaidClient` and its configuration layer.
#[derive(Error, Debug)]
pub enum PlaidError {
    /// Client id, secret or mode could not be resolved.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The transport failed before a response was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server returned 404.
    #[error("resource not found")]
    NotFound,

    /// The server returned a non-2xx status other than 404.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body is not valid JSON.
    #[error("decode failed: {0}")]
    Decode(String),

    /// A request field could not be encoded as JSON.
    #[error("encode failed: {0}")]
    Encode(String),
}

impl PlaidError {
    /// Whether a failed call is worth repeating under a retry policy.
    pub fn is_transient(&self, retryable_statuses: &[u16]) -> bool {
        match self {
            PlaidError::Transport(_) => true,
            PlaidError::HttpError { status, .. } => retryable_statuses.contains(status),
            _ => false,
        }
    }
}
