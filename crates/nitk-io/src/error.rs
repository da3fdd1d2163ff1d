//! Error types for NIfTI file utilities.

use std::path::PathBuf;
use std::process::ExitStatus;
use thiserror::Error;

/// Main error type for nitk-io operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The NIfTI codec rejected the file.
    #[error("NIfTI codec error: {0}")]
    Codec(#[from] nifti::NiftiError),

    /// Filesystem error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Axis count does not match what the operation needs.
    #[error("Shape mismatch: expected {expected:?}, got {actual:?}")]
    Shape {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Image has too few (or too many) axes for the operation.
    #[error("Dimension error: {0}")]
    Dimension(String),

    /// The orientation tool ran and reported failure.
    #[error("{program} exited with {status}: {stderr}")]
    ExternalTool {
        program: String,
        status: ExitStatus,
        stderr: String,
    },

    /// The orientation tool could not be started.
    #[error("could not run {program}: {source}")]
    ToolUnavailable {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Memoization store failure.
    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Result type for nitk-io operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create a dimension error.
    pub fn dimension(msg: impl Into<String>) -> Self {
        Self::Dimension(msg.into())
    }

    /// Create a cache error.
    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache(msg.into())
    }

    /// Create an invalid argument error.
    pub fn invalid_argument(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Cache(format!("manifest: {}", err))
    }
}

impl From<ndarray::ShapeError> for Error {
    fn from(err: ndarray::ShapeError) -> Self {
        Self::Dimension(err.to_string())
    }
}
