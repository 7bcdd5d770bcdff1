//! Error types for the Earth Engine client.

use thiserror::Error;

/// Errors produced while configuring, authenticating against, or
/// evaluating expressions on Earth Engine.
#[derive(Error, Debug)]
pub enum CloudError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("Earth Engine returned {status} ({code}): {message}")]
    Remote {
        code: u16,
        status: String,
        message: String,
    },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("{0}")]
    Core(#[from] spectra_core::Error),
}

/// Result alias for cloud operations.
pub type Result<T> = std::result::Result<T, CloudError>;
