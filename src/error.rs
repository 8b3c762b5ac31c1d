use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure of a single fetch step. Cloneable so a failed traversal can hand
/// its terminal error to the fetcher without giving up its state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    #[error("connectivity check failed: {0}")]
    Connectivity(String),

    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    #[error("request to {url} failed: {message}")]
    Request { url: String, message: String },

    #[error("API error: {0}")]
    Api(String),

    #[error("undecodable response: {0}")]
    Decode(String),
}

/// Coarse error taxonomy reported in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Connectivity,
    Transport,
    Api,
    Decode,
    /// The resource was fetched but its pages could not be written.
    Write,
}

impl FetchError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FetchError::Connectivity(_) => ErrorKind::Connectivity,
            FetchError::Status { .. } | FetchError::Request { .. } => ErrorKind::Transport,
            FetchError::Api(_) => ErrorKind::Api,
            FetchError::Decode(_) => ErrorKind::Decode,
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(e: serde_json::Error) -> Self {
        FetchError::Decode(e.to_string())
    }
}
