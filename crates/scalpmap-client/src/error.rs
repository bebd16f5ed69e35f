use thiserror::Error;

/// Failure taxonomy for backend calls: local parameter validation blocks
/// the call before any network I/O; transport and non-2xx failures
/// surface verbatim, with the server's own message when it provides one.
/// Partial data (missing electrodes) is never an error.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("missing required parameter: {0}")]
    MissingParameter(&'static str),
    #[error("server returned {status}: {msg}")]
    Server { status: u16, msg: String },
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("reading upload file: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ApiError>;
