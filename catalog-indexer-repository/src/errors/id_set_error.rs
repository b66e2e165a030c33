//! Id set store error types.

use thiserror::Error;

/// Errors that can occur while talking to the impacted-id set store.
#[derive(Error, Debug)]
pub enum IdSetError {
    /// The connection to the store was lost, refused or timed out.
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// The store rejected a command.
    #[error("Command error: {0}")]
    CommandError(String),

    /// A stored member is not a valid work id.
    #[error("Decode error: {0}")]
    DecodeError(String),
}

impl IdSetError {
    /// Create a connection error.
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::ConnectionError(msg.into())
    }

    /// Create a command error.
    pub fn command(msg: impl Into<String>) -> Self {
        Self::CommandError(msg.into())
    }

    /// Create a decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeError(msg.into())
    }

    /// Whether retrying the same command may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::ConnectionError(_))
    }
}

impl From<redis::RedisError> for IdSetError {
    fn from(err: redis::RedisError) -> Self {
        if err.is_connection_dropped()
            || err.is_connection_refusal()
            || err.is_io_error()
            || err.is_timeout()
        {
            Self::ConnectionError(err.to_string())
        } else {
            Self::CommandError(err.to_string())
        }
    }
}
