//! Error taxonomy for the sync engine.
//!
//! Every fallible operation returns one of these enums so callers have to
//! handle the failure explicitly.  Only [`FetchError`] is ever shown to the
//! user; [`RecordSkipped`] is a warning that never leaves the page it came
//! from.

use std::fmt;

use thiserror::Error;

/// A failure below HTTP: DNS, connect, TLS, or timeout.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("could not connect: {0}")]
    Connect(String),

    #[error("transport failure: {0}")]
    Other(String),
}

/// The payload was not valid JSON at all.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid JSON at line {line}, column {column}: {message}")]
pub struct ParseError {
    pub line: usize,
    pub column: usize,
    pub message: String,
}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// Why a single page request failed.  A failure is page-fatal: nothing from
/// the page is merged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("HTTP error {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl FetchError {
    /// HTTP status code, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Failure of a resource cache lookup.  Cloneable because every waiter on an
/// in-flight fetch receives its own copy of the outcome.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CacheError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("HTTP error {0}")]
    HttpStatus(u16),

    #[error("could not decode resource: {0}")]
    Decode(String),

    #[error("resource task aborted: {0}")]
    Aborted(String),
}

/// A record dropped from an otherwise valid page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordSkipped {
    /// Position of the record inside the page array.
    pub index: usize,
    pub reason: String,
}

impl fmt::Display for RecordSkipped {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "record {} skipped: {}", self.index, self.reason)
    }
}
