use serde_json::Value;
use thiserror::Error;

use shared_models::error::AppError;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Clinic backend not configured: CLINIC_API_URL is empty")]
    NotConfigured,

    #[error("Authorization token is not a valid header value")]
    InvalidToken,

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Backend error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(#[from] serde_json::Error),
}

impl BackendError {
    pub fn status(&self) -> Option<u16> {
        match self {
            BackendError::Api { status, .. } => Some(*status),
            BackendError::Transport(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotConfigured => AppError::Internal(err.to_string()),
            BackendError::InvalidToken => AppError::Auth(err.to_string()),
            BackendError::Api { status, message } => match status {
                401 | 403 => AppError::Auth(message),
                404 => AppError::NotFound(message),
                409 => AppError::Conflict(message),
                400 | 422 => AppError::BadRequest(message),
                _ => AppError::ExternalService(message),
            },
            BackendError::Transport(_) | BackendError::Decode(_) => {
                AppError::ExternalService(err.to_string())
            }
        }
    }
}

/// Pulls a human-readable message out of a failed response body.
///
/// Looks for a string `message` field, then `error` (either a string or an
/// object carrying its own `message`), and otherwise returns the raw text.
pub fn extract_error_message(body: &str) -> String {
    let trimmed = body.trim();
    if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) {
        if let Some(Value::String(message)) = map.get("message") {
            return message.clone();
        }
        match map.get("error") {
            Some(Value::String(error)) => return error.clone(),
            Some(Value::Object(inner)) => {
                if let Some(Value::String(message)) = inner.get("message") {
                    return message.clone();
                }
            }
            _ => {}
        }
    }
    trimmed.to_string()
}
