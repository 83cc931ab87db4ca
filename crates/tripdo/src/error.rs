//! Error types for tripdo.
//!
//! Every fallible operation in the crate returns [`Result`]. Storage failures,
//! corrupted stored values and stale positional references are all reported
//! to the caller; nothing is swallowed.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for tripdo operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Storage Errors ===
    /// Failed to open or create the database.
    #[error("failed to open database at {path}: {source}")]
    DatabaseOpen {
        /// Path to the database file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: rusqlite::Error,
    },

    /// The key-value store could not be read or written.
    #[error("storage unavailable: {0}")]
    StoreUnavailable(#[from] rusqlite::Error),

    /// Failed to run database migrations.
    #[error("database migration failed: {message}")]
    DatabaseMigration {
        /// Description of what went wrong.
        message: String,
    },

    /// The value stored under a key is not a valid serialized list.
    #[error("stored value under '{key}' is corrupted: {source}")]
    CorruptedStore {
        /// The storage key holding the bad value.
        key: String,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The stored list changed since it was last read.
    #[error("list '{key}' was modified by another writer; refresh and retry")]
    Conflict {
        /// The storage key that was modified.
        key: String,
    },

    // === Record Errors ===
    /// A record field failed validation.
    #[error("invalid {field}: {message}")]
    Validation {
        /// Name of the offending field.
        field: &'static str,
        /// Description of the validation failure.
        message: String,
    },

    /// A positional reference points past the end of the list.
    #[error("index {index} is out of range for a list of {len} records")]
    IndexOutOfRange {
        /// The requested index.
        index: usize,
        /// The current list length.
        len: usize,
    },

    /// No trip with the given id exists.
    #[error("trip {id} not found")]
    TripNotFound {
        /// The requested trip id.
        id: i64,
    },

    /// The trip detail view was opened without a trip.
    #[error("no trip was provided to the detail view")]
    MissingTrip,

    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A specialized Result type for tripdo operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a new validation error.
    #[must_use]
    pub fn validation(field: &'static str, message: impl Into<String>) -> Self {
        Self::Validation {
            field,
            message: message.into(),
        }
    }

    /// Create a conflict error for the given key.
    #[must_use]
    pub fn conflict(key: impl Into<String>) -> Self {
        Self::Conflict { key: key.into() }
    }

    /// Check if this error means the stored list changed underneath us.
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }

    /// Check if this error is a corrupted stored value.
    #[must_use]
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::CorruptedStore { .. })
    }

    /// Check if this error comes from the storage backend.
    #[must_use]
    pub fn is_store_unavailable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_) | Self::DatabaseOpen { .. })
    }
}
