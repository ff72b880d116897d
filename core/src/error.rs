use std::path::PathBuf;

use thiserror::Error;

/// Coarse classification of [`Error`] used by the dispatcher and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Required identifier/argument missing or malformed.
    InvalidArgument,
    /// JSON content does not match the expected shape.
    Decode,
    /// Transport failure or non-2xx response from the scheduler API.
    Request,
    /// The image-pull subprocess failed to start or exited non-zero.
    ExternalTool,
    /// A sync target path does not exist.
    NotFound,
    /// Local I/O failure (reading a job file, walking a directory).
    Io,
}

/// Failure reported by a transport before any response arrived.
pub type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// Why a request to the scheduler API failed.
#[derive(Debug, Error)]
pub enum RequestError {
    /// The request never produced a response.
    #[error("{0}")]
    Transport(#[source] TransportError),

    /// The API answered outside `200..=299`; the body is kept for diagnostics.
    #[error("bad response: {code}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Raw response body.
        body: Vec<u8>,
    },
}

/// Errors produced by the syncer core.
#[derive(Debug, Error)]
pub enum Error {
    /// Required identifier/argument missing or malformed.
    #[error("invalid {0}")]
    InvalidArgument(String),

    /// JSON content does not match the expected shape.
    #[error("failed to unmarshal JSON data due to {0}")]
    Decode(#[from] serde_json::Error),

    /// Transport failure or non-2xx response.
    #[error("failed to {op} due to {source}")]
    Request {
        /// Operation being attempted, e.g. `"fetch jobs"`.
        op: &'static str,
        /// Underlying failure.
        #[source]
        source: RequestError,
    },

    /// The image-pull subprocess failed.
    #[error("{0}")]
    ExternalTool(String),

    /// A path passed to `sync` does not exist.
    #[error("no such file or directory: {}", .0.display())]
    NotFound(PathBuf),

    /// Reading a file or walking a directory failed.
    #[error("{}: {source}", .path.display())]
    Io {
        /// Path being read.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Decode(_) => ErrorKind::Decode,
            Error::Request { .. } => ErrorKind::Request,
            Error::ExternalTool(_) => ErrorKind::ExternalTool,
            Error::NotFound(_) => ErrorKind::NotFound,
            Error::Io { .. } => ErrorKind::Io,
        }
    }

    /// HTTP status of a failed API call, if the API answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Request { source: RequestError::Status { code, .. }, .. } => Some(*code),
            _ => None,
        }
    }

    pub(crate) fn request(op: &'static str, source: RequestError) -> Self {
        Error::Request { op, source }
    }
}

/// Render `err` and its causes on one line, skipping causes whose text is already shown.
///
/// Most messages here embed their immediate cause, so a plain `{:#}` would repeat it.
pub fn display_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut msg = err.to_string();
    for cause in std::iter::successors(err.source(), |e| e.source()) {
        let text = cause.to_string();
        if !msg.contains(&text) {
            msg.push_str(": ");
            msg.push_str(&text);
        }
    }
    msg
}

/// Result alias for the syncer core.
pub type Result<T> = std::result::Result<T, Error>;
