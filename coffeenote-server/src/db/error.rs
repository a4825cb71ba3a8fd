//! Database error type and its classification for the connection manager

use std::io;

/// How the connection manager should react to an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The handle is gone; reconnect.
    ConnectionLost,
    /// Transport failed in an unexpected way; terminate.
    Transport,
    /// The statement failed but the handle is still usable.
    Query,
}

/// Database error type
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),

    #[error("Database connection is not available")]
    Disconnected,

    #[error("connection lost: {0}")]
    ConnectionLost(String),

    #[error("transport error: {0}")]
    Transport(String),
}

impl DbError {
    /// Classify this error for the connection state machine.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionLost(_) => ErrorKind::ConnectionLost,
            Self::Transport(_) => ErrorKind::Transport,
            Self::Disconnected => ErrorKind::Query,
            Self::Sqlx(e) => classify_sqlx(e),
        }
    }

    /// Raw message surfaced to HTTP callers.
    ///
    /// Server-side MySQL errors yield the server's own text, without the
    /// driver's "error returned from database" prefix.
    pub fn message(&self) -> String {
        match self {
            Self::Sqlx(sqlx::Error::Database(e)) => e.message().to_owned(),
            other => other.to_string(),
        }
    }
}

fn classify_sqlx(err: &sqlx::Error) -> ErrorKind {
    match err {
        sqlx::Error::Io(e) => match e.kind() {
            io::ErrorKind::ConnectionReset
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::BrokenPipe
            | io::ErrorKind::UnexpectedEof
            | io::ErrorKind::NotConnected => ErrorKind::ConnectionLost,
            _ => ErrorKind::Transport,
        },
        sqlx::Error::Tls(_) | sqlx::Error::Protocol(_) => ErrorKind::Transport,
        _ => ErrorKind::Query,
    }
}
