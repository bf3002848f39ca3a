//! Error handling utilities shared across the crate.

use std::path::PathBuf;

use thiserror::Error;

/// Convenient result type used throughout the crate.
pub type Result<T, E = ChipError> = std::result::Result<T, E>;

/// Domain-specific error describing failures while loading datasets or materialising directories.
#[derive(Debug, Error)]
pub enum ChipError {
    /// Link or manifest configuration failed validation.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        /// Underlying IO error returned by the standard library.
        source: std::io::Error,
        /// Target path associated with the IO failure if available.
        path: Option<PathBuf>,
    },
    /// Serialization or deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(String),
    /// A manifest could not be parsed.
    #[error("malformed manifest {path:?} (line {line:?}): {message}")]
    Manifest {
        /// Manifest being read.
        path: PathBuf,
        /// 1-based line number for JSON Lines input.
        line: Option<usize>,
        /// Parser message.
        message: String,
    },
    /// A chip produced a class key that is absent from the class index map.
    #[error("class key {0:?} is not present in the class index map")]
    UnknownClass(String),
    /// A chip's source path has no file name component to link under.
    #[error("chip source {path:?} has no file name")]
    InvalidChip {
        /// Offending source path.
        path: PathBuf,
    },
    /// Strict metadata validation found a chip without a required field.
    #[error("chip {path:?} is missing metadata field {field:?}")]
    MissingMetadata {
        /// Source path of the chip.
        path: PathBuf,
        /// Field that was absent.
        field: String,
    },
    /// Catch-all variant for invariants that should not occur.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for ChipError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl ChipError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }
}
