//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Storage error: {0}")]
    Storage(#[from] portal_storage::StorageError),

    #[error("Session error: {0}")]
    Session(#[from] portal_session::SessionError),

    #[error("API error: {0}")]
    Api(#[from] portal_api::ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not signed in")]
    NotAuthenticated,

    #[error("Login response did not yield a valid session")]
    LoginRejected,

    #[error("Invalid withdrawal amount: {0}")]
    InvalidAmount(f64),
}
