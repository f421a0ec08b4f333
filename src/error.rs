//! Error types for xbridge-rs.
//!
//! This module defines the [`Error`] enum which represents all possible
//! errors that can occur during XBRL-XML parsing, conversion, and validation.

use std::path::PathBuf;

/// The main error type for xbridge-rs operations.
///
/// This enum covers every bucket of the error taxonomy: fatal parse errors,
/// fatal conversion errors, missing collaborators (taxonomy artefacts), and
/// I/O failures. Rule-implementation findings are never represented here —
/// rules never propagate, they append to a [`crate::rules::Finding`] list.
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// An I/O error occurred while reading or writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The input XML was not well-formed, or a required structural invariant
    /// (single schema reference, `filed` value in `{true,false,0,1}`, etc.)
    /// was violated.
    #[error("fatal parse error: {message}")]
    FatalParse {
        /// A description of what makes the document invalid.
        message: String,
        /// Line number in the source document, when known.
        line: Option<u64>,
        /// Column number in the source document, when known.
        column: Option<u64>,
    },

    /// Conversion could not complete: an allowed-values normalisation was
    /// impossible, or strict filing-indicator validation failed.
    #[error("fatal conversion error: {message}")]
    FatalConversion {
        /// A description of the conversion failure.
        message: String,
    },

    /// A required collaborator artefact (taxonomy index or module file) is
    /// missing, and the operation cannot proceed without it.
    ///
    /// Note: validation tolerates this by skipping module-dependent rules;
    /// only the conversion pipeline treats it as fatal.
    #[error("missing collaborator: {message}")]
    MissingCollaborator {
        /// A description of what was missing.
        message: String,
    },

    /// The ZIP archive is corrupt or not a recognisable XBRL-CSV package.
    #[error("corrupt package: {message}")]
    CorruptPackage {
        /// A description of what makes the package invalid.
        message: String,
    },

    /// A taxonomy-loading error, forwarded from the `eba-taxonomy` crate.
    #[error("taxonomy error: {0}")]
    Taxonomy(#[from] eba_taxonomy::Error),

    /// A CSV reading/writing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// A ZIP archive reading/writing error.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A path-related error occurred (e.g. a required file is missing).
    #[error("path error: {message} (path: {path:?})")]
    Path {
        /// A description of the path error.
        message: String,
        /// The problematic path.
        path: PathBuf,
    },
}

impl Error {
    /// Creates a new [`Error::FatalParse`] error with no known position.
    #[must_use]
    pub fn fatal_parse(message: impl Into<String>) -> Self {
        Self::FatalParse {
            message: message.into(),
            line: None,
            column: None,
        }
    }

    /// Creates a new [`Error::FatalParse`] error with a known line/column.
    #[must_use]
    pub fn fatal_parse_at(message: impl Into<String>, line: u64, column: u64) -> Self {
        Self::FatalParse {
            message: message.into(),
            line: Some(line),
            column: Some(column),
        }
    }

    /// Creates a new [`Error::FatalConversion`] error.
    #[must_use]
    pub fn fatal_conversion(message: impl Into<String>) -> Self {
        Self::FatalConversion {
            message: message.into(),
        }
    }

    /// Creates a new [`Error::MissingCollaborator`] error.
    #[must_use]
    pub fn missing_collaborator(message: impl Into<String>) -> Self {
        Self::MissingCollaborator {
            message: message.into(),
        }
    }

    /// Creates a new [`Error::CorruptPackage`] error.
    #[must_use]
    pub fn corrupt_package(message: impl Into<String>) -> Self {
        Self::CorruptPackage {
            message: message.into(),
        }
    }
}

/// A type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
