//! Error types shared by the want-manager core and the collaborators it
//! consumes (network transport, decision engine).

use thiserror::Error;

/// Errors produced by the core or the network collaborator it drives.
///
/// Per the core's error handling policy, most of these are logged and
/// swallowed inside the event loop and sender tasks — a `CoreError` only
/// ever reaches a caller from a synchronous, caller-blocking operation
/// such as a block send.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Content-address parsing or validation errors.
    #[error("key error: {0}")]
    Key(#[from] cid::Error),

    /// I/O errors surfaced by the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A `connect` or `send` call to a peer failed.
    #[error("network error: {message}")]
    Network { message: String },

    /// A synchronous operation did not complete in time.
    #[error("operation timed out")]
    Timeout,

    /// Generic error with a custom message, for conditions that don't
    /// warrant their own variant.
    #[error("{message}")]
    Other { message: String },
}

impl CoreError {
    /// Build a [`CoreError::Network`] from any displayable message.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Build a [`CoreError::Other`] with a custom message.
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }
}
