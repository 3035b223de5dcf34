//! Error types for loadstone
//!
//! Provides a unified error type for all operations. The taxonomy mirrors the
//! run semantics: fatal variants abort the whole load, recoverable conditions
//! are surfaced as retry outcomes rather than errors, and soft failures are
//! logged where they occur.

use std::path::PathBuf;

use thiserror::Error;

/// Result type alias using LoadError
pub type Result<T> = std::result::Result<T, LoadError>;

/// Unified error type for loadstone operations
#[derive(Debug, Error)]
pub enum LoadError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // -------------------------------------------------------------------------
    // File Format Errors
    // -------------------------------------------------------------------------
    #[error("Malformed data file {path}: {reason}")]
    MalformedFile { path: PathBuf, reason: String },

    #[error("Data file {0} has no entries")]
    EmptyFile(PathBuf),

    // -------------------------------------------------------------------------
    // Schema / Metadata Errors
    // -------------------------------------------------------------------------
    #[error("Unmatched family names found: {unmatched:?}; valid families are: {valid:?}")]
    SchemaMismatch {
        unmatched: Vec<String>,
        valid: Vec<String>,
    },

    #[error("Partition metadata error: {0}")]
    PartitionMetadata(String),

    #[error("Table '{0}' does not exist")]
    TableNotFound(String),

    #[error("Table '{0}' is not currently available")]
    TableUnavailable(String),

    // -------------------------------------------------------------------------
    // Load Admission Errors
    // -------------------------------------------------------------------------
    #[error(
        "Trying to load more than {limit} files to family {family} of the partition \
         with start key {start_key}"
    )]
    FileCountExceeded {
        family: String,
        start_key: String,
        limit: usize,
    },

    #[error(
        "Retry attempted {attempts} times without completing, bailing out \
         ({remaining} files remaining)"
    )]
    RetryBudgetExhausted { attempts: usize, remaining: usize },

    #[error("File {0} committed to a different partition than originally planned")]
    PlacementDrift(PathBuf),

    // -------------------------------------------------------------------------
    // Collaborator Errors
    // -------------------------------------------------------------------------
    #[error("Cluster error: {0}")]
    Cluster(String),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl LoadError {
    /// Path-aware constructor for format errors
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        LoadError::MalformedFile {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
