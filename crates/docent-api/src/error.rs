//! Error types for docent-api

use thiserror::Error;

/// Result type alias using docent-api Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when talking to the doc-eval backend
#[derive(Error, Debug)]
pub enum Error {
    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Reading a local file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Backend answered with a non-success HTTP status
    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    /// Backend answered 2xx but the envelope reports failure
    #[error("Request rejected by backend: {0}")]
    Envelope(String),

    /// Unexpected response format
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

impl Error {
    /// Create a status error from a code and response body
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Human-readable reason suitable for a transcript error message
    pub fn reason(&self) -> String {
        match self {
            Error::Status { status, body } if body.trim().is_empty() => {
                format!("server returned status {}", status)
            }
            Error::Status { status, body } => {
                let body = body.trim();
                let preview: String = body.chars().take(200).collect();
                format!("server returned status {}: {}", status, preview)
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_other_variants_use_display() {
        assert_eq!(
            Error::UnexpectedResponse("odd".into()).reason(),
            "Unexpected response: odd"
        );
        assert_eq!(
            Error::Envelope("nope".into()).reason(),
            "Request rejected by backend: nope"
        );
    }

    #[test]
    fn test_reason_empty_body() {
        assert_eq!(Error::status(503, "  ").reason(), "server returned status 503");
    }

    #[test]
    fn test_reason_truncates_long_body() {
        let body = "x".repeat(500);
        let reason = Error::status(500, body).reason();
        assert_eq!(reason.len(), "server returned status 500: ".len() + 200);
    }
}
