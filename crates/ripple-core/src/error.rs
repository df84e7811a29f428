//! Unified error types for the Ripple core.
//!
//! This module provides the error types shared by every layer: transport
//! failures, platform API errors, event decoding errors and storage misuse.
//! Dispatch-level errors (filters, handlers, the poll loop) are defined in
//! `ripple-framework`.

use thiserror::Error;

// =============================================================================
// Transport Errors
// =============================================================================

/// Errors that can occur while talking to the upstream platform over the wire.
///
/// These are hard failures. The core never retries them; they propagate to
/// the caller of the poll loop.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// I/O or connection-level failure.
    #[error("I/O error: {0}")]
    Io(String),

    /// The server answered with a non-success HTTP status.
    #[error("HTTP {status} error: {body}")]
    Http {
        /// The HTTP status code.
        status: u16,
        /// The response body, if it could be read.
        body: String,
    },

    /// The response body was not valid JSON.
    #[error("failed to decode response body: {0}")]
    Decode(String),

    /// The transport was given an unusable configuration.
    #[error("invalid transport configuration: {0}")]
    InvalidConfig(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

// =============================================================================
// API Errors
// =============================================================================

/// Error type for platform API method calls.
#[derive(Debug, Clone, Error)]
pub enum ApiError {
    /// The platform reported an `error` object for the call.
    #[error("API error ({code}): {message}")]
    Api { code: i64, message: String },

    /// The response had neither a `response` nor an `error` member.
    #[error("malformed API response: {0}")]
    MalformedResponse(String),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::MalformedResponse(err.to_string())
    }
}

// =============================================================================
// Decode Errors
// =============================================================================

/// Errors raised when a raw long-poll update cannot be turned into an event.
#[derive(Debug, Clone, Error)]
pub enum DecodeError {
    /// A field the dispatcher relies on is absent.
    #[error("update is missing required field '{0}'")]
    MissingField(&'static str),

    /// The update has the wrong shape.
    #[error("invalid update: {0}")]
    Invalid(String),
}

impl From<serde_json::Error> for DecodeError {
    fn from(err: serde_json::Error) -> Self {
        Self::Invalid(err.to_string())
    }
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Errors raised by per-peer state storage.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// The dispatcher was built without persistence; any state access is a
    /// configuration mistake.
    #[error("no storage configured: enable storage on the dispatcher to use per-peer state")]
    Disabled,

    /// State was requested for an event that carries no peer.
    #[error("the current event is not bound to a peer")]
    NoPeer,
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Result type for API calls.
pub type ApiResult<T> = Result<T, ApiError>;

/// Result type for event decoding.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;
