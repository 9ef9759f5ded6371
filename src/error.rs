//! Error types for CopyTool
//!
//! Every failure the copy can hit maps to one variant here, and every
//! variant maps to a process exit code.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Main error type for CopyTool operations
#[derive(Error, Debug)]
pub enum CopyToolError {
    /// Wrong command line usage
    #[error("{0}")]
    Usage(String),

    /// Source path does not exist
    #[error("Source file not found: {0}")]
    NotFound(PathBuf),

    /// Destination exists and the user refused to overwrite it
    #[error("Destination '{0}' already exists, not overwriting")]
    OverwriteDeclined(PathBuf),

    /// Source and destination are the same file
    #[error("Source and destination are the same: {0}")]
    SameSourceAndDestination(PathBuf),

    /// Source or destination could not be opened
    #[error("Cannot open '{path}': {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// I/O error while copying
    #[error("I/O error at '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Peek on an empty queue
    #[error("Queue is empty")]
    EmptyQueue,

    /// A timed wait on the queue elapsed
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// The pipeline was aborted before it completed
    #[error("Operation cancelled")]
    Cancelled,

    /// Destination contents differ from what was read
    #[error("Integrity check failed for '{path}': expected {expected}, got {actual}")]
    IntegrityMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },

    /// Invalid configuration value
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A producer or consumer thread panicked
    #[error("Worker thread '{0}' panicked")]
    WorkerPanicked(String),

    /// A worker thread could not be started
    #[error("Thread pool error: {0}")]
    ThreadPoolError(String),

    /// The copy report could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl CopyToolError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create an open failure with path context
    pub fn open_failed(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::OpenFailed {
            path: path.into(),
            source,
        }
    }

    /// Create an integrity mismatch error
    pub fn integrity_mismatch(
        path: impl Into<PathBuf>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::IntegrityMismatch {
            path: path.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError(message.into())
    }

    /// Process exit code reported for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) | Self::ConfigError(_) | Self::SameSourceAndDestination(_) => {
                exit_code::WRONG_USAGE
            }
            Self::NotFound(_) => exit_code::SOURCE_MISSING,
            Self::OverwriteDeclined(_) => exit_code::DESTINATION_EXISTS,
            Self::OpenFailed { .. } => exit_code::OPEN_FAILED,
            Self::Io { .. } | Self::Timeout(_) => exit_code::IO_FAILED,
            Self::IntegrityMismatch { .. } => exit_code::INTEGRITY_MISMATCH,
            Self::Cancelled => exit_code::CANCELLED,
            Self::EmptyQueue
            | Self::WorkerPanicked(_)
            | Self::ThreadPoolError(_)
            | Self::Serialization(_) => exit_code::INTERNAL,
        }
    }

    /// True for the variant produced when a role stopped because the other side aborted
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Get the path associated with this error, if any
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Self::NotFound(path)
            | Self::OverwriteDeclined(path)
            | Self::SameSourceAndDestination(path)
            | Self::OpenFailed { path, .. }
            | Self::Io { path, .. }
            | Self::IntegrityMismatch { path, .. } => Some(path),
            _ => None,
        }
    }
}

/// Process exit codes
pub mod exit_code {
    /// Copy completed
    pub const SUCCESS: i32 = 0;
    /// Fewer than two paths, an invalid option value, or source equals destination
    pub const WRONG_USAGE: i32 = -1;
    /// Source path does not exist
    pub const SOURCE_MISSING: i32 = -2;
    /// Destination exists and overwrite was declined
    pub const DESTINATION_EXISTS: i32 = -3;
    /// Source or destination could not be opened
    pub const OPEN_FAILED: i32 = -4;
    /// Read or write failed mid-copy
    pub const IO_FAILED: i32 = -5;
    /// Verification found different contents
    pub const INTEGRITY_MISMATCH: i32 = -6;
    /// Copy was cancelled
    pub const CANCELLED: i32 = -7;
    /// Worker panic, report serialization failure, or queue contract violation
    pub const INTERNAL: i32 = -8;
}

/// Result type alias for CopyTool operations
pub type Result<T> = std::result::Result<T, CopyToolError>;

impl From<serde_json::Error> for CopyToolError {
    fn from(err: serde_json::Error) -> Self {
        CopyToolError::Serialization(err.to_string())
    }
}

/// Extension trait for adding path context to std::io::Result
pub trait IoResultExt<T> {
    /// Add path context to an I/O error
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T>;

    /// Add path context, classifying the failure as an open failure
    fn open_context(self, path: impl Into<PathBuf>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::io::Result<T> {
    fn with_path(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| CopyToolError::io(path, e))
    }

    fn open_context(self, path: impl Into<PathBuf>) -> Result<T> {
        self.map_err(|e| CopyToolError::open_failed(path, e))
    }
}
