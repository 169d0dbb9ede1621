//! Error types for the REST clients
//!
//! Every HTTP-backed integration (Elasticsearch, Kibana, Jira, Confluence,
//! Google Cloud) maps responses onto these variants.

use thiserror::Error;

/// Errors that can occur when talking to a REST API
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (network error, timeout, etc.)
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API returned an error response
    #[error("API error ({status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse the API response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Credentials were rejected
    #[error("Not authenticated - check the credentials in your configuration")]
    Unauthorized,

    /// Requested resource was not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// The object already exists (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// User does not have permission for the requested operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded - please try again later")]
    RateLimited,

    /// Server error
    #[error("Server error ({status}): {message}")]
    ServerError {
        /// HTTP status code (5xx)
        status: u16,
        /// Error message
        message: String,
    },

    /// Base URL is not usable
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Map a non-success status and its body onto an error variant
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 => ApiError::Unauthorized,
            403 => ApiError::PermissionDenied(message),
            404 => ApiError::NotFound(message),
            409 => ApiError::Conflict(message),
            429 => ApiError::RateLimited,
            500..=599 => ApiError::ServerError {
                status: status_code,
                message,
            },
            _ => ApiError::ApiError {
                status: status_code,
                message,
            },
        }
    }

    /// Whether this error means the resource already exists
    pub fn is_conflict(&self) -> bool {
        matches!(self, ApiError::Conflict(_))
    }

    /// Whether this error means the resource does not exist
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound(_))
    }
}

/// Result type alias for REST operations
pub type Result<T> = std::result::Result<T, ApiError>;
