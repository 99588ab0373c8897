//! Error types for the Satoru admin client.

use thiserror::Error;

/// Failures surfaced by the HTTP adapter and the services built on it.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend rejected the credentials and the refresh path is
    /// exhausted for this request.
    #[error("not authenticated")]
    Unauthorized,

    /// Token refresh itself failed; all stored credentials were cleared.
    #[error("session expired")]
    SessionExpired,

    #[error("{0}")]
    NotFound(String),

    /// Non-2xx response outside the handled auth cases, message verbatim
    /// from the backend where one was provided.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Request rejected client-side before any HTTP call was issued.
    #[error("validation error: {0}")]
    Validation(String),

    #[error("credential storage error: {0}")]
    Storage(String),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ApiError {
    /// Message suitable for store state and user-facing error banners.
    pub fn user_message(&self) -> String {
        match self {
            ApiError::Network(err) if err.is_timeout() => "Request timed out".to_string(),
            ApiError::Network(_) => "Network error".to_string(),
            ApiError::Unauthorized => "Not authenticated".to_string(),
            ApiError::SessionExpired => "Session expired".to_string(),
            ApiError::NotFound(message) => message.clone(),
            ApiError::Api { message, .. } => message.clone(),
            ApiError::Validation(message) => message.clone(),
            ApiError::Storage(_) | ApiError::Decode(_) => "Unexpected error".to_string(),
        }
    }

    /// Backend-provided message if there is one, otherwise the fallback.
    /// Mirrors how the dashboard surfaces thunk failures.
    pub fn message_or(&self, fallback: &str) -> String {
        match self {
            ApiError::Api { message, .. } | ApiError::NotFound(message) => message.clone(),
            ApiError::Validation(message) => message.clone(),
            _ => fallback.to_string(),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        ApiError::Validation(errors.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
