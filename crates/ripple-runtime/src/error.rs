//! Runtime error types.

use thiserror::Error;

use ripple_core::{StorageError, TransportError};
use ripple_framework::DispatchError;

use crate::config::ConfigError;

/// Errors surfaced by [`RippleRuntime`](crate::RippleRuntime).
#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The HTTP bot could not be constructed.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The polling loop ended with an error.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// The store failed to close.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Result type for runtime operations.
pub type RuntimeResult<T> = Result<T, RuntimeError>;
