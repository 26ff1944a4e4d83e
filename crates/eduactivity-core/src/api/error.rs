use reqwest::StatusCode;
use thiserror::Error;

use crate::auth::CredentialError;

#[derive(Error, Debug)]
pub enum ApiError {
    /// The login or registration endpoint refused the submitted credentials
    #[error("Credentials rejected ({status}): {}", truncate_body(.body))]
    CredentialRejected { status: StatusCode, body: String },

    #[error("Unauthorized - token may be expired")]
    Unauthorized { body: String },

    #[error("Access denied: {}", truncate_body(.body))]
    AccessDenied { body: String },

    #[error("Resource not found: {}", truncate_body(.body))]
    NotFound { body: String },

    #[error("Rate limited - please wait before retrying")]
    RateLimited { body: String },

    #[error("Server error ({status}): {}", truncate_body(.body))]
    ServerError { status: StatusCode, body: String },

    #[error("Request failed ({status}): {}", truncate_body(.body))]
    Status { status: StatusCode, body: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Credential storage failed: {0}")]
    Credentials(#[from] CredentialError),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Truncate a response body to avoid logging excessive data
fn truncate_body(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY_LENGTH {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY_LENGTH;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
}

impl ApiError {
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let body = body.to_string();
        match status.as_u16() {
            401 => ApiError::Unauthorized { body },
            403 => ApiError::AccessDenied { body },
            404 => ApiError::NotFound { body },
            429 => ApiError::RateLimited { body },
            500..=599 => ApiError::ServerError { status, body },
            _ => ApiError::Status { status, body },
        }
    }

    /// Reclassify a 401 from the login or registration endpoint.
    pub(crate) fn into_credential_rejection(self) -> Self {
        match self {
            ApiError::Unauthorized { body } => ApiError::CredentialRejected {
                status: StatusCode::UNAUTHORIZED,
                body,
            },
            other => other,
        }
    }

    /// HTTP status of the upstream response, if there was one
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::CredentialRejected { status, .. }
            | ApiError::ServerError { status, .. }
            | ApiError::Status { status, .. } => Some(*status),
            ApiError::Unauthorized { .. } => Some(StatusCode::UNAUTHORIZED),
            ApiError::AccessDenied { .. } => Some(StatusCode::FORBIDDEN),
            ApiError::NotFound { .. } => Some(StatusCode::NOT_FOUND),
            ApiError::RateLimited { .. } => Some(StatusCode::TOO_MANY_REQUESTS),
            ApiError::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Full upstream response body, untruncated
    pub fn body(&self) -> Option<&str> {
        match self {
            ApiError::CredentialRejected { body, .. }
            | ApiError::Unauthorized { body }
            | ApiError::AccessDenied { body }
            | ApiError::NotFound { body }
            | ApiError::RateLimited { body }
            | ApiError::ServerError { body, .. }
            | ApiError::Status { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Upstream error payload parsed as JSON (e.g. field validation errors)
    pub fn payload(&self) -> Option<serde_json::Value> {
        self.body().and_then(|b| serde_json::from_str(b).ok())
    }

    /// True for authentication-class failures
    pub fn is_auth_failure(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}
