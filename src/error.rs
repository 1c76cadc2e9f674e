// src/error.rs
//! Typed failures for each stage of a monitoring cycle.
//!
//! The loop never terminates because of one of these: everything ends up as a
//! [`CycleError`] that is logged, after which the monitor sleeps and tries again.

use std::fmt;

use thiserror::Error;

/// Outcome classification of a single HTTP attempt.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connection refused/reset or timed out. Worth retrying.
    #[error("transient network error: {0}")]
    Transient(String),
    /// Non-2xx status, malformed response, bad request. Never retried.
    #[error("network error: {0}")]
    Fatal(String),
}

impl TransportError {
    pub fn is_transient(&self) -> bool {
        matches!(self, TransportError::Transient(_))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error("giving up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: String },
    #[error("page fetch failed: {0}")]
    Fatal(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    #[error("content region not found (tried {selectors:?})")]
    ContentNotFound { selectors: Vec<String> },
    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("token refresh failed: {0}")]
    TokenRefresh(String),
    #[error("api rejected message (code {code}): {message}")]
    Api { code: i64, message: String },
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("state file io ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Failure that ended a cycle early.
#[derive(Debug, Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Persist(#[from] StateError),
}

impl CycleError {
    /// Phase in which the cycle was aborted.
    pub fn phase(&self) -> crate::monitor::CyclePhase {
        use crate::monitor::CyclePhase;
        match self {
            CycleError::Fetch(_) => CyclePhase::Fetching,
            CycleError::Extract(_) => CyclePhase::Extracting,
            CycleError::Persist(_) => CyclePhase::Persisting,
        }
    }
}

/// Short label for log fields.
pub(crate) struct ErrorKind<'a>(pub &'a CycleError);

impl fmt::Display for ErrorKind<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self.0 {
            CycleError::Fetch(FetchError::Exhausted { .. }) => "network_transient",
            CycleError::Fetch(FetchError::Fatal(_)) => "network_fatal",
            CycleError::Extract(_) => "extraction_failure",
            CycleError::Persist(_) => "persistence",
        };
        f.write_str(s)
    }
}
