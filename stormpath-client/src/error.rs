//! Error types for stormpath-client

use thiserror::Error;

/// Main error type for the client module
#[derive(Error, Debug)]
pub enum Error {
    /// Transport failures (connect, read, status)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server rejected or returned an unusable payload
    #[error("Server error: {0}")]
    Server(String),
}

/// Convenience Result type using the client Error
pub type Result<T> = std::result::Result<T, Error>;
