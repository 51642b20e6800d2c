//! Error taxonomy for the review pipeline core
//!
//! `NotFound` and `Validation` abort a request before any mutation;
//! `Generation` surfaces provider failures (isolated per item in batch runs).

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// A project or pipeline item does not exist
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Input rejected before any mutation took place
    #[error("validation failed: {0}")]
    Validation(String),

    /// The external generation provider failed or returned garbage
    #[error("generation failed: {0}")]
    Generation(String),

    /// Document store I/O or serialization failure
    #[error("storage error: {0}")]
    Storage(anyhow::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Error::Storage(e)
    }
}

impl Error {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Error::NotFound {
            kind,
            id: id.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Error::Validation(msg.into())
    }

    pub fn generation(msg: impl Into<String>) -> Self {
        Error::Generation(msg.into())
    }
}

/// Result alias used throughout the core
pub type Result<T> = std::result::Result<T, Error>;
