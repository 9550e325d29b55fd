use std::time::Duration;

use serde_json::Value;
use thiserror::Error;

use crate::notify::Notification;

/// Failures surfaced by the gateway, normalized from raw transport results.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// One display line per problem. Field errors are numbered from 1.
    #[error("Validation failed: {}", .0.join("; "))]
    Validation(Vec<String>),

    #[error("Unauthorized - session is missing or expired")]
    Unauthorized,

    #[error("Resource not found: {0}")]
    NotFound(String),

    /// 403 is reported here as the forbidden subtype.
    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("{message}")]
    Unknown { status: Option<u16>, message: String },
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

/// Validation errors that list fields stay on screen longer.
const FIELD_ERRORS_DISPLAY: Duration = Duration::from_millis(7000);

const NETWORK_HINT: &str = "Please check your internet connection.";

impl ApiError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    /// Classify a non-success response by status code.
    pub fn from_status(status: u16, body: &str) -> Self {
        let parsed = serde_json::from_str::<Value>(body).ok();
        let message = parsed
            .as_ref()
            .and_then(Self::body_message)
            .or_else(|| {
                // Only fall back to raw text when the body wasn't JSON
                let raw = body.trim();
                (!raw.is_empty() && parsed.is_none()).then(|| Self::truncate_body(raw))
            });

        match status {
            422 => {
                let fields = parsed.as_ref().map(Self::field_errors).unwrap_or_default();
                if fields.is_empty() {
                    ApiError::Validation(vec![
                        message.unwrap_or_else(|| "Validation failed".to_string())
                    ])
                } else {
                    ApiError::Validation(
                        fields
                            .iter()
                            .enumerate()
                            .map(|(i, m)| format!("{}. {}", i + 1, m))
                            .collect(),
                    )
                }
            }
            401 => ApiError::Unauthorized,
            404 => ApiError::NotFound(message.unwrap_or_else(|| Self::fallback_message(status))),
            403 | 500..=599 => ApiError::Server {
                status,
                message: message.unwrap_or_else(|| Self::fallback_message(status)),
            },
            _ => ApiError::Unknown {
                status: Some(status),
                message: message.unwrap_or_else(|| Self::fallback_message(status)),
            },
        }
    }

    /// Top-level `message`, when it is a non-blank string.
    fn body_message(body: &Value) -> Option<String> {
        body.get("message")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_string)
    }

    /// One entry per element of `errors`. Entries without a usable `message`
    /// still count, described by their `path` or `code`.
    fn field_errors(body: &Value) -> Vec<String> {
        let Some(errors) = body.get("errors").and_then(Value::as_array) else {
            return Vec::new();
        };
        errors
            .iter()
            .map(|entry| {
                Self::body_message(entry).unwrap_or_else(|| Self::describe_field_error(entry))
            })
            .collect()
    }

    fn describe_field_error(entry: &Value) -> String {
        let path = entry
            .get("path")
            .and_then(Value::as_array)
            .map(|parts| {
                parts
                    .iter()
                    .map(|p| match p {
                        Value::String(s) => s.clone(),
                        other => other.to_string(),
                    })
                    .collect::<Vec<_>>()
                    .join(".")
            })
            .filter(|p| !p.is_empty());
        let code = entry.get("code").and_then(Value::as_str);
        match (path, code) {
            (Some(path), Some(code)) => format!("{}: {}", path, code),
            (Some(path), None) => format!("{}: invalid value", path),
            (None, Some(code)) => code.to_string(),
            (None, None) => "Invalid value".to_string(),
        }
    }

    fn fallback_message(status: u16) -> String {
        format!("Request failed with status code {}", status)
    }

    pub fn is_forbidden(&self) -> bool {
        matches!(self, ApiError::Server { status: 403, .. })
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Unauthorized)
    }

    /// Failures worth retrying when the caller opts into a retry policy.
    pub fn is_retryable(&self) -> bool {
        match self {
            ApiError::Network(_) => true,
            ApiError::Server { status, .. } => matches!(status, 502..=504),
            ApiError::Unknown { status: Some(429), .. } => true,
            _ => false,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Validation(_) => Some(422),
            ApiError::Unauthorized => Some(401),
            ApiError::NotFound(_) => Some(404),
            ApiError::Server { status, .. } => Some(*status),
            ApiError::Network(_) => None,
            ApiError::Unknown { status, .. } => *status,
        }
    }

    /// The single user-facing message for this failure.
    pub fn notification(&self) -> Notification {
        match self {
            ApiError::Validation(lines) => {
                let numbered = lines.len() > 1 || lines.first().is_some_and(|l| l.starts_with("1. "));
                let n = Notification::new("Data Validation Error", lines.join("\n"));
                if numbered {
                    n.with_duration(FIELD_ERRORS_DISPLAY)
                } else {
                    n
                }
            }
            ApiError::Unauthorized => Notification::new(
                "Authentication Error",
                "Your session has expired. Please log in again.",
            ),
            ApiError::NotFound(message) => Notification::new("Not Found", message.clone()),
            ApiError::Server { status: 403, message } => {
                Notification::new("Forbidden", message.clone())
            }
            ApiError::Server { message, .. } => Notification::new("Server Error", message.clone()),
            ApiError::Network(_) => Notification::new("Network Error", NETWORK_HINT),
            ApiError::Unknown {
                status: Some(400),
                message,
            } => Notification::new("Bad Request", message.clone()),
            ApiError::Unknown { message, .. } => Notification::new("Error", message.clone()),
        }
    }
}
