//! Error types for taxonomy module loading.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for taxonomy loading operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when loading a taxonomy index or module.
#[derive(Debug, Error)]
pub enum Error {
    /// IO error reading files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    /// The taxonomy index file (`index.json`) is missing.
    ///
    /// Per the loader's contract this is tolerated by callers: it means "no
    /// taxonomy available", not a hard failure. The error is still produced
    /// so that callers who *do* need the taxonomy can surface it.
    #[error("missing taxonomy index: {0}")]
    MissingIndex(PathBuf),

    /// The index has no entry for a requested entry-point URL.
    #[error("unknown entry point: {0}")]
    UnknownEntryPoint(String),

    /// The index names a module file that does not exist on disk.
    #[error("missing module file: {0}")]
    MissingModule(PathBuf),

    /// The module file exists but failed to deserialize.
    #[error("corrupt module {path}: {message}")]
    CorruptModule {
        /// Path of the corrupt module file.
        path: PathBuf,
        /// Description of the deserialisation failure.
        message: String,
    },
}
