//! Error types for spectra-core

use thiserror::Error;

/// Main error type for request parsing and index definitions
#[derive(Error, Debug)]
pub enum Error {
    #[error("invalid request JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("request has no geometry: `geometry` list is empty")]
    MissingGeometry,

    #[error("invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("year {0} is outside the supported calendar range")]
    InvalidYear(i32),

    #[error("Invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("formula error: {0}")]
    Formula(String),

    #[error("band '{band}' is not bound in formula for {index}")]
    UnboundBand { index: String, band: String },
}

/// Result type alias for spectra-core operations
pub type Result<T> = std::result::Result<T, Error>;
