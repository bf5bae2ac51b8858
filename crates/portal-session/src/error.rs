//! Session error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Storage error: {0}")]
    Storage(#[from] portal_storage::StorageError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Malformed credential: {0}")]
    MalformedCredential(String),

    #[error("Unknown route: {0}")]
    UnknownRoute(String),
}
