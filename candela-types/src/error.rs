use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for the candela workspace.
///
/// Distinguishes transport failures from successful-but-empty responses so a
/// chart can show "request failed" and "no data in range" differently.
#[derive(Debug, Error, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CandelaError {
    /// The backend could not be reached or answered with an unusable body.
    #[error("{connector} failed: {msg}")]
    Fetch {
        /// Source name that failed.
        connector: String,
        /// Human-readable error message.
        msg: String,
    },

    /// The backend answered successfully but no usable point fell in the window.
    #[error("no data for window {window} ({dropped} malformed rows dropped)")]
    Empty {
        /// Cache key of the window that came back empty.
        window: String,
        /// Rows discarded while parsing the response.
        dropped: usize,
    },

    /// A single row could not be parsed; callers drop the row, not the batch.
    #[error("malformed point: {0}")]
    Malformed(String),

    /// Invalid input argument.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// The configured request deadline elapsed before the source answered.
    #[error("request timed out: {window}")]
    RequestTimeout {
        /// Cache key of the window being loaded.
        window: String,
    },

    /// Unknown/opaque error.
    #[error("unknown error: {0}")]
    Other(String),
}

impl CandelaError {
    /// Helper: build a `Fetch` error with the source name and message.
    pub fn fetch(connector: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            connector: connector.into(),
            msg: msg.into(),
        }
    }

    /// Helper: build an `Empty` error for a window key.
    pub fn empty(window: impl Into<String>, dropped: usize) -> Self {
        Self::Empty {
            window: window.into(),
            dropped,
        }
    }

    /// Helper: build a `RequestTimeout` error.
    pub fn request_timeout(window: impl Into<String>) -> Self {
        Self::RequestTimeout {
            window: window.into(),
        }
    }

    /// True for a successful response that carried no usable points.
    #[must_use]
    pub const fn is_empty_result(&self) -> bool {
        matches!(self, Self::Empty { .. })
    }

    /// True when the request itself failed (transport, status, body, deadline).
    #[must_use]
    pub const fn is_fetch_failure(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::RequestTimeout { .. })
    }
}
