//! Error types for Gantry CI.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    // Store errors
    #[error("Database error: {0}")]
    Database(String),

    #[error("Work item not found: {0}")]
    WorkItemNotFound(String),

    // Checkout errors
    #[error("Checkout failed: {0}")]
    Checkout(String),

    // Notification errors
    #[error("Notification delivery failed: {0}")]
    Notify(String),

    // Infrastructure errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    // Generic
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}
