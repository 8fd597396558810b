//! Error types for Couchbase admin REST operations.
//!
//! Errors are categorized so callers can decide how to report them.
//! Nothing in this crate retries; a failed request is surfaced as-is with
//! whatever the server sent back.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Result type alias for admin REST operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Categories of admin REST errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Connection refused, DNS failure, reset, etc.
    Transport,
    /// The server answered with a non-success status.
    Rejected,
    /// The response body could not be understood.
    Format,
    /// Local file access failed.
    Io,
}

impl ErrorCategory {
    /// Get a user-friendly description of this error category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::Transport => "Could not reach the cluster",
            Self::Rejected => "Request rejected by the cluster",
            Self::Format => "Unexpected response format",
            Self::Io => "File access failed",
        }
    }

    /// Get actionable advice for resolving this error category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::Transport => "Check CB_REST_HOST / CB_REST_PORT and that Couchbase is running",
            Self::Rejected => "Check credentials and the response body for the reason",
            Self::Format => "The cluster version may not be supported",
            Self::Io => "Check permissions on the defaults file",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while talking to the admin REST API.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Transport error or non-2xx response.
    #[error("{method} {path} failed{}: {}", status_suffix(.status), body_or_placeholder(.body))]
    RequestFailed {
        /// HTTP method.
        method: &'static str,
        /// Request path (without host).
        path: String,
        /// HTTP status code, `None` for transport errors.
        status: Option<u16>,
        /// Response body, or the transport error message.
        body: String,
    },

    /// Response could not be decoded.
    #[error("invalid API response: {0}")]
    InvalidResponse(String),

    /// IO error reading a local file.
    #[error("IO error at {path}: {source}")]
    Io {
        /// Path involved in the error.
        path: PathBuf,
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

fn status_suffix(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

fn body_or_placeholder(body: &str) -> &str {
    let trimmed = body.trim();
    if trimmed.is_empty() { "<empty body>" } else { trimmed }
}

impl Error {
    /// Create an IO error with path context.
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a request failure.
    pub fn request_failed(
        method: &'static str,
        path: impl Into<String>,
        status: Option<u16>,
        body: impl Into<String>,
    ) -> Self {
        Self::RequestFailed {
            method,
            path: path.into(),
            status,
            body: body.into(),
        }
    }

    /// Get the error category.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::RequestFailed { status: None, .. } => ErrorCategory::Transport,
            Error::RequestFailed { .. } => ErrorCategory::Rejected,
            Error::InvalidResponse(_) => ErrorCategory::Format,
            Error::Io { .. } => ErrorCategory::Io,
        }
    }

    /// HTTP status of a rejected request, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::RequestFailed { status, .. } => *status,
            _ => None,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse(err.to_string())
    }
}
