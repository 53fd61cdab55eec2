//! Error types for linking and oracle queries.

use std::path::PathBuf;

/// Typed error for input loading and oracle round-trips.
///
/// Not-found answers are never errors; they surface as `None`. The variants
/// here abort the linking stage.
#[derive(Debug, thiserror::Error)]
pub enum DiscoverError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing failure in an input document.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The debugger process could not be started.
    #[error("failed to start symbol oracle for {image}: {source}")]
    OracleSpawn {
        image: PathBuf,
        source: std::io::Error,
    },

    /// The debugger process went away mid-session.
    #[error("symbol oracle for {0} closed unexpectedly")]
    OracleClosed(PathBuf),

    /// The debugger answered with text that is neither a location nor a
    /// not-defined message.
    #[error("malformed symbol oracle response for {symbol}: {response:?}")]
    MalformedResponse { symbol: String, response: String },

    /// The text search exited with a status other than "no matches".
    #[error("search for {ident} under {dir} failed (exit {code:?}): {stderr}")]
    SearchFailed {
        ident: String,
        dir: PathBuf,
        code: Option<i32>,
        stderr: String,
    },

    /// Invalid or missing input (e.g. non-existent catalog document).
    #[error("{0}")]
    InvalidInput(String),
}

/// Convenience alias for results with [`DiscoverError`].
pub type Result<T> = std::result::Result<T, DiscoverError>;
