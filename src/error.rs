use thiserror::Error;

use crate::tester::{TesterKind, TesterOperation};

/// Failures surfaced by a [`crate::client::TunesClient`] implementation.
#[derive(Error, Debug)]
pub enum RemoteError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("could not build URL for {path}: {reason}")]
    Url { path: String, reason: String },

    #[error("{method} {url} failed with {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("failed to parse JSON response: {0}")]
    Json(#[from] serde_json::Error),

    #[error("iTunes Connect reported: {}", .0.join("; "))]
    Service(Vec<String>),

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[derive(Error, Debug)]
pub enum TunesError {
    #[error("{operation} is not supported for {kind} testers")]
    UnsupportedOperation {
        kind: TesterKind,
        operation: TesterOperation,
    },

    #[error(transparent)]
    Remote(#[from] RemoteError),
}

pub type Result<T, E = TunesError> = std::result::Result<T, E>;
