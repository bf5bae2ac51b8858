//! API error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Request failed (HTTP {status}): {body}")]
    Status { status: u16, body: String },

    /// 401 or 404 on an authenticated call; the session should end
    #[error("Not authorized (HTTP {0})")]
    Unauthorized(u16),

    #[error("No credential for authenticated request")]
    MissingCredential,

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ApiError {
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized(_) | ApiError::MissingCredential)
    }
}
