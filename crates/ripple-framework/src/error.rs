//! Error types for the Ripple framework.

use thiserror::Error;

use ripple_core::{DecodeError, StorageError, TransportError};

use crate::factory::RegistryKind;

/// A boxed error raised by user handler code.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised by the long-poll client.
///
/// The platform's `failed` codes 1, 2 and 3 are recovered inside the client
/// and never show up here.
#[derive(Debug, Clone, Error)]
pub enum LongPollError {
    /// The endpoint returned a shape this client does not recognise.
    #[error("long-poll protocol error: {0}")]
    Protocol(String),

    /// The "acquire session" call reported an `error` member.
    #[error("failed to acquire long-poll session: {0}")]
    SessionAcquisition(String),

    /// Transport error.
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors raised while resolving or evaluating filters.
#[derive(Debug, Clone, Error)]
pub enum FilterError {
    /// Declarative arguments that no bound filter type claimed.
    #[error("unknown filter argument(s) for {registry:?} handlers: {}", .keys.join(", "))]
    UnknownArgument {
        /// The registry the handler was being registered on.
        registry: RegistryKind,
        /// The unclaimed keys, sorted.
        keys: Vec<String>,
    },

    /// A claimed argument has an unusable value.
    #[error("invalid arguments for filter '{filter}': {reason}")]
    InvalidArgument { filter: &'static str, reason: String },

    /// Storage error raised by a state-aware filter.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl FilterError {
    /// Creates an invalid argument error.
    pub fn invalid(filter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            filter,
            reason: reason.into(),
        }
    }
}

/// Errors that can occur during handler parameter extraction.
#[derive(Debug, Clone, Error)]
pub enum ExtractError {
    /// The handler asked for a message but the event carries none.
    #[error("event '{0}' carries no message")]
    NotAMessage(String),

    /// Storage error raised while binding per-peer state.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Custom extraction error.
    #[error("{0}")]
    Custom(String),
}

impl ExtractError {
    /// Creates a custom extraction error.
    pub fn custom(msg: impl Into<String>) -> Self {
        Self::Custom(msg.into())
    }
}

/// Top-level errors surfaced by the dispatcher.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `start_polling` was called while the loop is already running.
    #[error("dispatcher is already polling")]
    AlreadyPolling,

    #[error(transparent)]
    LongPoll(#[from] LongPollError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error(transparent)]
    Extract(#[from] ExtractError),

    /// A handler returned an error.
    #[error("handler failed: {0}")]
    Handler(BoxError),
}

/// Result type for long-poll operations.
pub type LongPollResult<T> = Result<T, LongPollError>;

/// Result type for filter resolution and evaluation.
pub type FilterResult<T> = Result<T, FilterError>;

/// Result type for extraction operations.
pub type ExtractResult<T> = Result<T, ExtractError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;
