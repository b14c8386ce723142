//! Error types for tars-ai

use thiserror::Error;

/// Result type alias using tars-ai Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the model endpoint
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// API returned an error response
    #[error("API error: {message} (type: {error_type})")]
    Api { error_type: String, message: String },

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Invalid API key
    #[error("Invalid or missing API key")]
    InvalidApiKey,

    /// Server-sent events error
    #[error("SSE error: {0}")]
    Sse(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Create an API error from type and message
    pub fn api(error_type: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Api {
            error_type: error_type.into(),
            message: message.into(),
        }
    }

    /// Classify a failed HTTP response.
    ///
    /// 401/403 and bodies that complain about the key become [`Error::Auth`];
    /// everything else is an ordinary [`Error::Api`].
    pub fn from_status(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        if status == 401 || status == 403 || mentions_credentials(&body) {
            return Error::Auth(body);
        }
        Error::api(format!("http_{}", status), body)
    }

    /// Check if this error is an authentication-class failure.
    ///
    /// These are never retried; the caller is expected to stop.
    pub fn is_auth(&self) -> bool {
        match self {
            Error::Auth(_) | Error::InvalidApiKey => true,
            Error::Api { message, .. } => mentions_credentials(message),
            _ => false,
        }
    }
}

fn mentions_credentials(message: &str) -> bool {
    let msg = message.to_lowercase();
    msg.contains("api key") || msg.contains("api_key") || msg.contains("authentication")
}
