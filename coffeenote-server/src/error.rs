//! Error types for coffeenote-server

use thiserror::Error;

use crate::db::DbError;
use crate::http::server::ServerError;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors that end [`crate::serve`]
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP server error: {0}")]
    Server(#[from] ServerError),

    /// Unrecoverable database transport failure. The process should exit
    /// and be restarted by whatever supervises it.
    #[error("fatal database error: {0}")]
    FatalDatabase(#[source] DbError),

    #[error("connection supervisor stopped: {0}")]
    Supervisor(#[from] tokio::task::JoinError),
}
