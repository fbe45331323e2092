//! Error taxonomy for the arrivals pipeline.
//!
//! Fetch and decode failures are absorbed per endpoint or per message and only
//! logged. A directory failure aborts the whole refresh and is the only error a
//! caller of [`crate::refresh::RefreshController::request`] ever sees.

use reqwest::StatusCode;
use thiserror::Error;

/// A single network request failed.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The request could not be sent or the body could not be read.
    #[error("request to {endpoint} failed: {source}")]
    Request {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with a non-success status.
    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: String, status: StatusCode },

    /// The bounded per-request timeout elapsed.
    #[error("request to {endpoint} timed out")]
    Timeout { endpoint: String },

    /// The worker task running the request panicked or was aborted.
    #[error("fetch task for {endpoint} did not complete: {reason}")]
    Task { endpoint: String, reason: String },

    #[error("invalid endpoint url {endpoint}: {reason}")]
    Url { endpoint: String, reason: String },
}

impl FetchError {
    /// Classifies a transport error, separating timeouts from other failures.
    ///
    /// The URL is stripped from `source` since credential decorators may have
    /// added the access key to it.
    pub fn from_reqwest(endpoint: &str, source: reqwest::Error) -> Self {
        let source = source.without_url();
        if source.is_timeout() {
            FetchError::Timeout {
                endpoint: endpoint.to_string(),
            }
        } else {
            FetchError::Request {
                endpoint: endpoint.to_string(),
                source,
            }
        }
    }

    /// HTTP status of the failed response, if the server answered at all.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// A response body was not a valid GTFS-RT `FeedMessage`.
#[derive(Error, Debug)]
#[error("feed decode failed: {0}")]
pub struct DecodeError(#[from] pub prost::DecodeError);

/// The station directory could not be loaded.
#[derive(Error, Debug)]
pub enum DirectoryError {
    #[error("station directory fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// A required column is absent from the header row.
    #[error("station directory is missing column {0:?}")]
    MissingColumn(String),

    #[error("station directory is malformed: {0}")]
    Parse(#[from] csv::Error),
}

/// A refresh failed as a whole; the previous snapshot stays current.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    Directory(#[from] DirectoryError),
}
