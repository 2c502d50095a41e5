use std::fmt;

use thiserror::Error;

/// The closed set of ways an enquiry can fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Validation,
    Authentication,
    RateLimit,
    Http,
    Transport,
    Parsing,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Validation => "ValidationError",
            ErrorKind::Authentication => "AuthenticationError",
            ErrorKind::RateLimit => "RateLimitError",
            ErrorKind::Http => "HttpError",
            ErrorKind::Transport => "TransportError",
            ErrorKind::Parsing => "ParsingError",
        })
    }
}

pub const AUTHENTICATION_MESSAGE: &str = "Invalid API key";
pub const RATE_LIMIT_MESSAGE: &str = "Too many requests";

/// Everything that can go wrong while querying the registry. A query either
/// returns a record or exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The registration number was rejected, either locally or by the registry.
    /// `code` and `title` are only present when the registry sent them.
    #[error("Validation error: {message}")]
    Validation {
        message: String,
        code: Option<String>,
        title: Option<String>,
    },
    #[error("Authentication error: Invalid API key")]
    Authentication,
    #[error("Rate limit exceeded: Too many requests")]
    RateLimit,
    /// Any other unsuccessful status. The body is kept verbatim.
    #[error("HTTP error {status}: {body}")]
    Http { status: u16, body: String },
    #[error("Request error: {message}")]
    Transport { message: String },
    #[error("Response parsing error: {message}")]
    Parsing { message: String },
}

impl RegistryError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        RegistryError::Validation {
            message: message.into(),
            code: None,
            title: None,
        }
    }

    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            RegistryError::Validation { .. } => ErrorKind::Validation,
            RegistryError::Authentication => ErrorKind::Authentication,
            RegistryError::RateLimit => ErrorKind::RateLimit,
            RegistryError::Http { .. } => ErrorKind::Http,
            RegistryError::Transport { .. } => ErrorKind::Transport,
            RegistryError::Parsing { .. } => ErrorKind::Parsing,
        }
    }

    /// The human readable message without the kind prefix used by `Display`.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            RegistryError::Validation { message, .. }
            | RegistryError::Transport { message }
            | RegistryError::Parsing { message } => message,
            RegistryError::Authentication => AUTHENTICATION_MESSAGE,
            RegistryError::RateLimit => RATE_LIMIT_MESSAGE,
            RegistryError::Http { body, .. } => body,
        }
    }

    /// The upstream error code, for registry-side validation failures.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            RegistryError::Validation { code, .. } => code.as_deref(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_prefixes_message_with_kind() {
        let err = RegistryError::validation("Registration number invalid");
        assert_eq!(err.to_string(), "Validation error: Registration number invalid");
        assert_eq!(err.message(), "Registration number invalid");
    }

    #[test]
    fn fixed_messages() {
        assert_eq!(RegistryError::Authentication.message(), AUTHENTICATION_MESSAGE);
        assert_eq!(
            RegistryError::RateLimit.to_string(),
            "Rate limit exceeded: Too many requests"
        );
    }

    #[test]
    fn http_error_keeps_status_and_body() {
        let err = RegistryError::Http {
            status: 503,
            body: "Service Unavailable".into(),
        };
        assert_eq!(err.kind(), ErrorKind::Http);
        assert_eq!(err.to_string(), "HTTP error 503: Service Unavailable");
    }
}
