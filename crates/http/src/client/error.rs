//! Client error types

use http::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Client error types
#[derive(Debug, Error)]
pub enum ClientError {
    /// Credential missing, expired, or the refresh call failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// No response was received
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),

    /// Server returned a non-success status
    #[error("Server error {status}: {message}")]
    Server {
        status: u16,
        message: String,
        /// Field-level validation messages, if the server sent any
        errors: Vec<String>,
    },

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The credential store could not be read or written
    #[error("Credential store error: {0}")]
    Store(String),
}

/// Error envelope the catalog API sends with failures
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    errors: Vec<FieldError>,
}

#[derive(Debug, Deserialize)]
struct FieldError {
    msg: String,
}

impl ClientError {
    /// Build a server error from a response status and raw body.
    ///
    /// Prefers the JSON `message` field, then the body text, then the
    /// canonical reason for the status.
    pub fn from_status(status: StatusCode, body: &[u8]) -> Self {
        let parsed: ErrorBody = serde_json::from_slice(body).unwrap_or_default();

        let message = parsed
            .message
            .filter(|m| !m.is_empty())
            .or_else(|| {
                let text = String::from_utf8_lossy(body).trim().to_string();
                if text.is_empty() || parsed_as_json(body) {
                    None
                } else {
                    Some(text)
                }
            })
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        Self::Server {
            status: status.as_u16(),
            message,
            errors: parsed.errors.into_iter().map(|e| e.msg).collect(),
        }
    }

    /// HTTP status carried by the error, if any
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the caller needs to log in again.
    ///
    /// True for a failed refresh and for a 401 that was not recovered.
    pub const fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Auth(_) | Self::Server { status: 401, .. })
    }

    /// The server-provided message, or the error's display text
    pub fn user_message(&self) -> String {
        match self {
            Self::Server { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

fn parsed_as_json(body: &[u8]) -> bool {
    serde_json::from_slice::<serde_json::Value>(body).is_ok()
}

impl From<url::ParseError> for ClientError {
    fn from(err: url::ParseError) -> Self {
        Self::Configuration(format!("invalid URL: {err}"))
    }
}
