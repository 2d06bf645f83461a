//! Error types for the Aptly API client.
//!
//! # Design
//! One enum covers every failure a call can produce. Configuration and verb
//! errors are caught before any I/O. Transport failures are never retried.
//! A response body that is not JSON is recovered into
//! `UnparseableResponse`, which carries the HTTP status.
//!
//! Aptly's own domain errors (`{"error": "..."}` bodies) are *not* mapped
//! here: they are valid JSON and reach the caller as ordinary values.

use thiserror::Error;

/// Shorthand used throughout the crate.
pub type Result<T> = std::result::Result<T, AptlyError>;

/// Errors returned by `AptlyClient` and its configuration builder.
#[derive(Debug, Error)]
pub enum AptlyError {
    /// The client configuration was rejected before any request was made.
    #[error("invalid configuration: {reason}")]
    InvalidConfiguration { reason: String },

    /// A verb outside GET/POST/PUT/DELETE was requested.
    #[error("unsupported HTTP verb: {verb}")]
    UnsupportedVerb { verb: String },

    /// The request never produced a response (connect, TLS, timeout).
    #[error("transport failure for {url}: {reason}")]
    Transport { url: String, reason: String },

    /// The server answered, but the body was not JSON.
    #[error(transparent)]
    UnparseableResponse(#[from] ResponseError),

    /// The server answered a non-JSON call with a non-success status.
    #[error("unexpected HTTP {status} from {url}")]
    UnexpectedStatus { url: String, status: u16 },

    /// A request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// A response value did not match the requested typed model.
    #[error("decoding response failed: {0}")]
    Decode(#[source] serde_json::Error),

    /// Reading an upload source or writing a download target failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Structured descriptor for a response whose body could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{context}: HTTP {status} returned a non-JSON body ({reason})")]
pub struct ResponseError {
    /// Caller-supplied context, or [`ResponseError::DEFAULT_CONTEXT`].
    pub context: String,
    /// Raw HTTP status code of the response.
    pub status: u16,
    /// The JSON parser's description of the failure.
    pub reason: String,
}

impl ResponseError {
    /// Placeholder used when a call supplies no context message.
    pub const DEFAULT_CONTEXT: &'static str = "aptly request";
}

impl AptlyError {
    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        AptlyError::InvalidConfiguration {
            reason: reason.into(),
        }
    }

    /// HTTP status attached to the error, when the server did answer.
    pub fn status(&self) -> Option<u16> {
        match self {
            AptlyError::UnparseableResponse(err) => Some(err.status),
            AptlyError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_error_display_carries_context_and_status() {
        let err = AptlyError::from(ResponseError {
            context: "show local repo".to_string(),
            status: 404,
            reason: "EOF while parsing a value".to_string(),
        });
        let text = err.to_string();
        assert!(text.starts_with("show local repo: HTTP 404"), "{text}");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn transport_error_has_no_status() {
        let err = AptlyError::Transport {
            url: "http://localhost/api".to_string(),
            reason: "connection refused".to_string(),
        };
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("connection refused"));
    }
}
