//! Unified error types for Stashly link previews.
//!
//! None of these reach the preview consumer: the fetcher and the image
//! materializer fold every variant into an empty field or an empty image
//! and report it through `tracing`.

use std::io;
use std::path::PathBuf;

/// Unified error types for the preview pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// URL could not be parsed or uses an unsupported scheme.
    #[error("INVALID_URL: {0}")]
    InvalidUrl(String),

    /// Request did not complete within the configured timeout.
    #[error("FETCH_TIMEOUT: {0}")]
    FetchTimeout(String),

    /// Transport failure or non-success status.
    #[error("HTTP_ERROR: {0}")]
    HttpError(String),

    /// Response body exceeded the configured size cap.
    #[error("FETCH_TOO_LARGE: {0}")]
    FetchTooLarge(String),

    /// Cached metadata could not be parsed.
    #[error("PARSE_ERROR: {0}")]
    Parse(String),

    /// Image bytes could not be decoded.
    #[error("DECODE_ERROR: {0}")]
    Decode(String),

    /// Reading or writing the cache tree failed.
    #[error("PERSISTENCE_ERROR: {}: {source}", path.display())]
    Persistence {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with the path it occurred on.
    pub fn persistence(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Persistence { path: path.into(), source }
    }

    /// Whether this error came from the network side of the pipeline.
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Error::InvalidUrl(_) | Error::FetchTimeout(_) | Error::HttpError(_) | Error::FetchTooLarge(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parse(err.to_string())
    }
}
