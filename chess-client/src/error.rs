//! Error taxonomy for the provider layer.
//!
//! Providers never swallow failures: backend-specific error shapes are
//! translated into these variants and re-raised, so every error carries a
//! kind and a message a UI can render.

use thiserror::Error;

pub type ClientResult<T> = Result<T, ClientError>;

#[derive(Error, Debug)]
pub enum ClientError {
    /// The rules engine rejected a move. Never retried automatically.
    #[error("illegal move: {from} -> {to}")]
    IllegalMove { from: String, to: String },

    /// An operation referenced a game id with no backing engine/session.
    #[error("no game with id {0}")]
    GameNotFound(String),

    /// Client-side capability guard: the operation was refused before any
    /// network call was made.
    #[error("{backend} does not support {operation}")]
    Unsupported {
        backend: &'static str,
        operation: &'static str,
    },

    /// A remote backend answered with a non-2xx status.
    #[error("backend error {status} ({code}): {message}")]
    Api {
        status: u16,
        code: String,
        message: String,
    },

    /// Transport-level failure: timeout, DNS, connection refused.
    #[error("network failure: {0}")]
    Network(String),

    /// The backend answered but the payload could not be understood.
    #[error("invalid response data: {0}")]
    InvalidData(String),

    /// A FEN string was rejected.
    #[error("invalid FEN: {0}")]
    InvalidFen(String),

    /// There is no move to undo.
    #[error("nothing to undo")]
    NothingToUndo,

    /// Mock transport was driven past its configured responses.
    #[error("mock response not configured for: {0}")]
    NotConfigured(String),
}

impl ClientError {
    /// True for failures that indicate the backend is unreachable, used to
    /// drive the selector's disconnected state.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Network(_))
    }
}
